use std::time::Duration;

use anyhow::Context as _;
use base64::Engine as _;
use bytes::Bytes;
use tracing::debug;

use crate::foundation::{
    config::RemoteConfig,
    error::{CasecraftError, CasecraftResult},
};

/// Routing key identifying the image upload pipeline at the collaborator.
pub const UPLOAD_ROUTE_KEY: &str = "imageUploader";

/// A file-like binary object handed to the upload collaborator.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn png(name: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: "image/png".to_string(),
            bytes,
        }
    }
}

/// Per-file result from the upload collaborator: an accessible reference URL
/// plus pixel dimensions when the collaborator measured them.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UploadedImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[allow(async_fn_in_trait)]
pub trait ImageUploader {
    async fn upload(
        &self,
        files: Vec<UploadFile>,
        config_id: &str,
    ) -> CasecraftResult<Vec<UploadedImage>>;
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest<'a> {
    route_key: &'static str,
    config_id: &'a str,
    files: Vec<UploadPayload>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadPayload {
    name: String,
    content_type: String,
    data: String,
}

pub struct HttpUploader {
    http: reqwest::Client,
    url: String,
}

impl HttpUploader {
    pub fn new(config: &RemoteConfig) -> CasecraftResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("casecraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            url: config.upload_url.clone(),
        })
    }
}

impl ImageUploader for HttpUploader {
    #[tracing::instrument(skip(self, files), fields(file_count = files.len()))]
    async fn upload(
        &self,
        files: Vec<UploadFile>,
        config_id: &str,
    ) -> CasecraftResult<Vec<UploadedImage>> {
        if files.is_empty() {
            return Err(CasecraftError::validation("upload requires at least one file"));
        }

        let payloads = files
            .into_iter()
            .map(|f| UploadPayload {
                name: f.name,
                content_type: f.content_type,
                data: base64::engine::general_purpose::STANDARD.encode(&f.bytes),
            })
            .collect();
        let request = UploadRequest {
            route_key: UPLOAD_ROUTE_KEY,
            config_id,
            files: payloads,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CasecraftError::save(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CasecraftError::save(format!(
                "upload collaborator returned {status}"
            )));
        }

        let uploaded: Vec<UploadedImage> = response
            .json()
            .await
            .map_err(|e| CasecraftError::save(format!("parse upload response: {e}")))?;
        debug!(uploaded = uploaded.len(), "upload complete");
        Ok(uploaded)
    }
}
