use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::foundation::error::{CasecraftError, CasecraftResult};

fn default_timeout_secs() -> u64 {
    30
}

/// Endpoints and credential for the remote collaborators.
///
/// The inference API credential is always injected from configuration, never
/// embedded in code. `CASECRAFT_API_KEY` overrides whatever a config file
/// carries, so checked-in files can omit the key entirely.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RemoteConfig {
    /// Upstream text-to-image inference endpoint.
    pub generation_url: String,

    /// Bearer credential for the generation endpoint.
    #[serde(default)]
    pub api_key: String,

    /// Upload collaborator endpoint.
    pub upload_url: String,

    /// Configuration persistence endpoint.
    pub persist_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn from_json_file(path: &Path) -> CasecraftResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let r = BufReader::new(f);
        let mut config: RemoteConfig =
            serde_json::from_reader(r).with_context(|| "parse config JSON")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> CasecraftResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CasecraftResult<Self> {
        let mut config = Self {
            generation_url: require(&lookup, "CASECRAFT_GENERATION_URL")?,
            api_key: String::new(),
            upload_url: require(&lookup, "CASECRAFT_UPLOAD_URL")?,
            persist_url: require(&lookup, "CASECRAFT_PERSIST_URL")?,
            timeout_secs: default_timeout_secs(),
        };
        config.override_api_key(lookup("CASECRAFT_API_KEY"));
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.override_api_key(std::env::var("CASECRAFT_API_KEY").ok());
    }

    fn override_api_key(&mut self, key: Option<String>) {
        if let Some(key) = key {
            self.api_key = key;
        }
    }

    pub fn validate(&self) -> CasecraftResult<()> {
        if self.generation_url.trim().is_empty() {
            return Err(CasecraftError::validation("generation_url must be set"));
        }
        if self.upload_url.trim().is_empty() {
            return Err(CasecraftError::validation("upload_url must be set"));
        }
        if self.persist_url.trim().is_empty() {
            return Err(CasecraftError::validation("persist_url must be set"));
        }
        if self.timeout_secs == 0 {
            return Err(CasecraftError::validation("timeout_secs must be > 0"));
        }
        Ok(())
    }
}

fn require(lookup: impl Fn(&str) -> Option<String>, name: &str) -> CasecraftResult<String> {
    lookup(name).ok_or_else(|| CasecraftError::validation(format!("{name} must be set")))
}
