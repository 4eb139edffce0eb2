use base64::Engine as _;
use bytes::Bytes;
use tracing::debug;

use crate::{
    foundation::error::{CasecraftError, CasecraftResult},
    overlay::state::{ImageResource, ImageSourceKind},
    remote::{
        generate::GenerationClient,
        upload::{ImageUploader, UploadFile},
    },
};

/// Strips the data-URI header and decodes the base64 payload.
pub(crate) fn decode_data_uri(uri: &str) -> CasecraftResult<Bytes> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CasecraftError::generation("expected a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CasecraftError::generation("data URI has no payload"))?;
    if !meta.ends_with(";base64") {
        return Err(CasecraftError::generation("data URI is not base64-encoded"));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| CasecraftError::generation(format!("decode data URI payload: {e}")))?;
    Ok(Bytes::from(bytes))
}

async fn measure_dimensions(bytes: Bytes) -> CasecraftResult<(u32, u32)> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&bytes)
            .map_err(|e| CasecraftError::generation(format!("decode generated image: {e}")))?;
        Ok(image::GenericImageView::dimensions(&img))
    })
    .await
    .map_err(|e| CasecraftError::generation(format!("measure task failed: {e}")))?
}

/// Normalizes the two acquisition paths (direct upload, remote text-to-image
/// generation) into one uploaded, URL-addressable [`ImageResource`].
///
/// Neither path returns until the upload collaborator has confirmed a
/// reference URL, so callers can hand the result straight to
/// [`OverlayState::attach`](crate::overlay::state::OverlayState::attach)
/// without ever showing an unpersisted image.
pub struct ExternalImageAcquirer<G, U> {
    generator: G,
    uploader: U,
}

impl<G: GenerationClient, U: ImageUploader> ExternalImageAcquirer<G, U> {
    pub fn new(generator: G, uploader: U) -> Self {
        Self {
            generator,
            uploader,
        }
    }

    /// Upload path: the user-selected file goes to the uploader as-is. The
    /// natural pixel dimensions come from pre-measured metadata supplied by
    /// the caller.
    #[tracing::instrument(skip(self, file))]
    pub async fn acquire_upload(
        &self,
        file: UploadFile,
        pixel_width: u32,
        pixel_height: u32,
        config_id: &str,
    ) -> CasecraftResult<ImageResource> {
        let bytes = file.bytes.clone();
        let url = self.upload_single(file, config_id).await?;
        Ok(ImageResource {
            source_kind: ImageSourceKind::Uploaded,
            pixel_width,
            pixel_height,
            bytes,
            url,
        })
    }

    /// Generation path: request an image for the prompt, decode the returned
    /// data URI, and feed the bytes through the same uploader as the upload
    /// path. Remote failures surface as generation errors and leave no
    /// trace; nothing is uploaded.
    #[tracing::instrument(skip(self))]
    pub async fn acquire_generated(
        &self,
        prompt: &str,
        config_id: &str,
    ) -> CasecraftResult<ImageResource> {
        let response = self.generator.generate(prompt).await?;
        let bytes = decode_data_uri(&response.image_url)?;
        let (pixel_width, pixel_height) = measure_dimensions(bytes.clone()).await?;
        debug!(pixel_width, pixel_height, "generated image decoded");

        let file = UploadFile::png("generated-image.png", bytes.clone());
        let url = self.upload_single(file, config_id).await?;
        Ok(ImageResource {
            source_kind: ImageSourceKind::Generated,
            pixel_width,
            pixel_height,
            bytes,
            url,
        })
    }

    async fn upload_single(&self, file: UploadFile, config_id: &str) -> CasecraftResult<String> {
        let uploaded = self.uploader.upload(vec![file], config_id).await?;
        let first = uploaded
            .into_iter()
            .next()
            .ok_or_else(|| CasecraftError::save("upload returned no file reference"))?;
        Ok(first.url)
    }
}
