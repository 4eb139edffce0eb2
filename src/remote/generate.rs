use std::time::Duration;

use anyhow::Context as _;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::foundation::{
    config::RemoteConfig,
    error::{CasecraftError, CasecraftResult},
};

/// Successful generation payload: a `data:image/png;base64,...` URI.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GenerationResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// Error payload shape of the generation contract.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GenerationFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[allow(async_fn_in_trait)]
pub trait GenerationClient {
    async fn generate(&self, prompt: &str) -> CasecraftResult<GenerationResponse>;
}

#[derive(serde::Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    options: InferenceOptions,
}

#[derive(serde::Serialize)]
struct InferenceOptions {
    // Ask the upstream to load the model synchronously instead of
    // returning a cold-start error.
    wait_for_model: bool,
}

/// Text-to-image client against the upstream inference API. The credential
/// comes from [`RemoteConfig`]; constructing a client without one fails.
pub struct HttpGenerationClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpGenerationClient {
    pub fn new(config: &RemoteConfig) -> CasecraftResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(CasecraftError::validation(
                "generation api key must be configured",
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("casecraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            url: config.generation_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

/// Reads an upstream error body into the contract's failure shape. Bodies
/// that are not the expected JSON are carried verbatim as the error text.
fn parse_failure_body(body: &str) -> GenerationFailure {
    serde_json::from_str(body).unwrap_or_else(|_| GenerationFailure {
        error: body.trim().to_string(),
        details: None,
    })
}

fn upstream_error(status: reqwest::StatusCode, failure: &GenerationFailure) -> CasecraftError {
    if failure.error.is_empty() {
        CasecraftError::generation(format!("upstream inference returned {status}"))
    } else {
        CasecraftError::generation(format!(
            "upstream inference returned {status}: {}",
            failure.error
        ))
    }
}

impl GenerationClient for HttpGenerationClient {
    /// Validates the prompt, requests inference, and wraps the returned
    /// PNG bytes as a base64 data URI. An empty prompt fails before any
    /// network traffic.
    #[tracing::instrument(skip(self))]
    async fn generate(&self, prompt: &str) -> CasecraftResult<GenerationResponse> {
        if prompt.trim().is_empty() {
            return Err(CasecraftError::validation("prompt is required"));
        }

        let body = InferenceRequest {
            inputs: prompt,
            options: InferenceOptions {
                wait_for_model: true,
            },
        };
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CasecraftError::generation(format!("generation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = parse_failure_body(&body);
            warn!(%status, error = %failure.error, "upstream inference error");
            return Err(upstream_error(status, &failure));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CasecraftError::generation(format!("read generated image: {e}")))?;
        debug!(len = bytes.len(), "received generated image");

        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(GenerationResponse {
            image_url: format!("data:image/png;base64,{encoded}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig {
            generation_url: "http://127.0.0.1:9/generate".to_string(),
            api_key: "test-key".to_string(),
            upload_url: "http://127.0.0.1:9/upload".to_string(),
            persist_url: "http://127.0.0.1:9/configs".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn client_requires_api_key() {
        let mut c = config();
        c.api_key = String::new();
        assert!(HttpGenerationClient::new(&c).is_err());
    }

    #[tokio::test]
    async fn empty_prompt_fails_without_network() {
        // The configured endpoint is unroutable; reaching it would fail
        // with a generation error, not a validation error.
        let client = HttpGenerationClient::new(&config()).unwrap();
        let err = client.generate("   ").await.unwrap_err();
        assert!(matches!(err, CasecraftError::Validation(_)));
        assert!(err.to_string().contains("prompt is required"));
    }

    #[tokio::test]
    async fn network_fault_is_a_generation_error() {
        let client = HttpGenerationClient::new(&config()).unwrap();
        let err = client.generate("a red dragon").await.unwrap_err();
        assert!(matches!(err, CasecraftError::Generation(_)));
    }

    #[test]
    fn upstream_failure_body_is_parsed_into_the_contract_shape() {
        let failure =
            parse_failure_body(r#"{"error":"Error from Hugging Face API","details":{"estimated_time":20.0}}"#);
        assert_eq!(failure.error, "Error from Hugging Face API");
        assert!(failure.details.is_some());

        let err = upstream_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &failure);
        assert!(matches!(err, CasecraftError::Generation(_)));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("Error from Hugging Face API"));
    }

    #[test]
    fn non_json_failure_body_is_carried_verbatim() {
        let failure = parse_failure_body("service unavailable\n");
        assert_eq!(failure.error, "service unavailable");
        assert!(failure.details.is_none());

        let empty = parse_failure_body("");
        let err = upstream_error(reqwest::StatusCode::BAD_GATEWAY, &empty);
        assert!(err.to_string().ends_with("returned 502 Bad Gateway"));
    }

    #[test]
    fn response_serde_uses_image_url_key() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"imageUrl":"data:image/png;base64,AA=="}"#).unwrap();
        assert!(response.image_url.starts_with("data:image/png"));

        let failure: GenerationFailure =
            serde_json::from_str(r#"{"error":"Prompt is required"}"#).unwrap();
        assert!(failure.details.is_none());
    }
}
