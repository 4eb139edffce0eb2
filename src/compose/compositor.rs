use std::io::Cursor;

use bytes::Bytes;
use tracing::debug;

use crate::{
    foundation::{
        error::{CasecraftError, CasecraftResult},
        geometry::{BoundingBox, container_offset},
    },
    overlay::state::{ImageResource, OverlayPlacement},
};

/// Live layout read of one element's rendered bounding box, in viewport
/// pixels. Returns `None` while the element is not mounted.
pub trait GeometryReader {
    fn bounding_box(&self) -> Option<BoundingBox>;
}

/// A reader with a fixed answer. Used by the CLI and by tests; an interactive
/// frontend supplies its own reader backed by real layout queries.
#[derive(Clone, Copy, Debug)]
pub struct FixedGeometry(pub BoundingBox);

impl GeometryReader for FixedGeometry {
    fn bounding_box(&self) -> Option<BoundingBox> {
        Some(self.0)
    }
}

/// The flattened raster output of one save. Produced fresh on every save,
/// never cached across saves.
#[derive(Clone, Debug)]
pub struct CompositeArtifact {
    /// Raw PNG bytes, no data-URI header.
    pub png: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Flattens the foreground image onto a surface sized to the template's
/// rendered dimensions, at the placement rectangle mapped into template
/// space.
///
/// Bounding boxes are read live here, not at placement time: layout can
/// shift between the user's last edit and the save. Either read failing
/// aborts with a recoverable error before any pixel work happens.
#[tracing::instrument(skip(template, container, placement, resource))]
pub async fn composite(
    template: &dyn GeometryReader,
    container: &dyn GeometryReader,
    placement: &OverlayPlacement,
    resource: &ImageResource,
) -> CasecraftResult<CompositeArtifact> {
    let template_box = template
        .bounding_box()
        .ok_or_else(|| CasecraftError::compositing("template element is not mounted"))?;
    let container_box = container
        .bounding_box()
        .ok_or_else(|| CasecraftError::compositing("container element is not mounted"))?;

    let offset = container_offset(template_box, container_box);
    let mapped = placement.in_template_space(offset);
    let (surface_width, surface_height) = template_box.pixel_size()?;

    debug!(
        x = mapped.position.x,
        y = mapped.position.y,
        width = mapped.size.width,
        height = mapped.size.height,
        surface_width,
        surface_height,
        "mapped overlay into template space"
    );

    // The foreground must be fully decoded before any drawing; drawing a
    // partially decoded image yields a blank or truncated composite.
    let encoded = resource.bytes.clone();
    let foreground = tokio::task::spawn_blocking(move || image::load_from_memory(&encoded))
        .await
        .map_err(|e| CasecraftError::compositing(format!("decode task failed: {e}")))?
        .map_err(|e| CasecraftError::compositing(format!("decode foreground image: {e}")))?;

    let mapped_x = mapped.position.x.round() as i64;
    let mapped_y = mapped.position.y.round() as i64;
    let target_width = mapped.size.width.round().max(0.0) as u32;
    let target_height = mapped.size.height.round().max(0.0) as u32;

    let png = tokio::task::spawn_blocking(move || -> CasecraftResult<Vec<u8>> {
        let mut surface = image::RgbaImage::new(surface_width, surface_height);

        if target_width > 0 && target_height > 0 {
            let scaled = foreground
                .resize_exact(
                    target_width,
                    target_height,
                    image::imageops::FilterType::Lanczos3,
                )
                .to_rgba8();
            // overlay clips to the surface bounds, so out-of-bounds
            // placement crops exactly as the user directed.
            image::imageops::overlay(&mut surface, &scaled, mapped_x, mapped_y);
        }

        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(surface)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .map_err(|e| CasecraftError::compositing(format!("encode composite png: {e}")))?;
        Ok(out)
    })
    .await
    .map_err(|e| CasecraftError::compositing(format!("composite task failed: {e}")))??;

    Ok(CompositeArtifact {
        png: Bytes::from(png),
        width: surface_width,
        height: surface_height,
    })
}
