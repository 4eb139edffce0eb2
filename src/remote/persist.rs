use std::time::Duration;

use anyhow::Context as _;
use tracing::debug;

use crate::foundation::{
    config::RemoteConfig,
    error::{CasecraftError, CasecraftResult},
};

/// The user's chosen product options. Externally defined enums, passed
/// through unchanged; this crate never interprets the values.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigurationSelection {
    pub color: String,
    pub model: String,
    pub material: String,
    pub finish: String,
}

#[allow(async_fn_in_trait)]
pub trait ConfigStore {
    async fn save(
        &self,
        config_id: &str,
        selection: &ConfigurationSelection,
    ) -> CasecraftResult<()>;
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveConfigRequest<'a> {
    config_id: &'a str,
    selection: &'a ConfigurationSelection,
}

pub struct HttpConfigStore {
    http: reqwest::Client,
    url: String,
}

impl HttpConfigStore {
    pub fn new(config: &RemoteConfig) -> CasecraftResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("casecraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            url: config.persist_url.clone(),
        })
    }
}

impl ConfigStore for HttpConfigStore {
    /// PUT keyed by configId; re-saving the same id overwrites.
    #[tracing::instrument(skip(self, selection))]
    async fn save(
        &self,
        config_id: &str,
        selection: &ConfigurationSelection,
    ) -> CasecraftResult<()> {
        let body = SaveConfigRequest {
            config_id,
            selection,
        };
        let response = self
            .http
            .put(format!("{}/{config_id}", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| CasecraftError::save(format!("persist request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CasecraftError::save(format!(
                "persistence collaborator returned {status}"
            )));
        }
        debug!(config_id, "selection persisted");
        Ok(())
    }
}
