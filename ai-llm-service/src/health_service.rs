//! Health probes for LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model listed under `models[].name`
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth, model listed under `data[].id`
//!
//! [`HealthService::check`] never fails: every error becomes `ok = false`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Reuses one HTTP client for all probes.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Probes one config. Failures are reported in the returned status.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let start = Instant::now();
        match self.try_probe(cfg).await {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    model = %status.model,
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status = HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string());
                warn!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Probes several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn try_probe(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let base = cfg.endpoint.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(HealthError::InvalidEndpoint(cfg.endpoint.clone()).into());
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .min(self.default_timeout);

        let (url, mut req) = match cfg.provider {
            LlmProvider::Ollama => {
                let url = format!("{base}/api/tags");
                let req = self.client.get(&url);
                (url, req)
            }
            LlmProvider::OpenAI => {
                let key = cfg.api_key.as_deref().ok_or_else(|| {
                    HealthError::Decode("missing OpenAI API key".into())
                })?;
                let auth = header::HeaderValue::from_str(&format!("Bearer {key}"))
                    .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;
                let url = format!("{base}/v1/models");
                let req = self.client.get(&url).header(header::AUTHORIZATION, auth);
                (url, req)
            }
        };
        req = req.timeout(timeout);

        let start = Instant::now();
        debug!(provider = ?cfg.provider, "GET {}", url);
        let resp = req.send().await.map_err(|e| AiLlmError::from_send(e, timeout))?;
        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            let status = resp.status();
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }

        // A reachable server with an unreadable listing still counts as healthy.
        let listing = match resp.json::<ModelListing>().await {
            Ok(listing) => listing,
            Err(e) => {
                return Ok(HealthStatus::new(
                    cfg,
                    true,
                    latency,
                    format!("reachable; model listing not decodable: {e}"),
                ));
            }
        };

        if listing.contains(&cfg.model) {
            Ok(HealthStatus::new(cfg, true, latency, "healthy; model is available"))
        } else {
            Ok(HealthStatus::new(cfg, false, latency, "reachable, but model is not listed"))
        }
    }
}

/// Union of the Ollama (`models[].name`) and OpenAI (`data[].id`) listings.
#[derive(Debug, Default, Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<NamedModel>,
    #[serde(default)]
    data: Vec<IdModel>,
}

#[derive(Debug, Deserialize)]
struct NamedModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IdModel {
    id: String,
}

impl ModelListing {
    fn contains(&self, model: &str) -> bool {
        // Ollama reports `llama3:latest` for a bare `llama3`.
        let tagged = format!("{model}:latest");
        self.models.iter().any(|m| m.name == model || m.name == tagged)
            || self.data.iter().any(|m| m.id == model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_matches_both_shapes() {
        let ollama: ModelListing =
            serde_json::from_str(r#"{"models":[{"name":"nomic-embed-text:latest"}]}"#).unwrap();
        assert!(ollama.contains("nomic-embed-text"));

        let openai: ModelListing =
            serde_json::from_str(r#"{"data":[{"id":"gpt-4o-mini"},{"id":"text-embedding-3-large"}]}"#)
                .unwrap();
        assert!(openai.contains("text-embedding-3-large"));
        assert!(!openai.contains("gpt-5"));
    }
}
