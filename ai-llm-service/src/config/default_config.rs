//! Profile configs loaded from environment variables.
//!
//! `LLM_KIND` picks the provider for both profiles (`openai` by default).
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`          = `openai` | `ollama`
//! - `CHAT_MODEL`        = chat model (default `gpt-4o-mini`)
//! - `EMBEDDING_MODEL`   = embedding model (default `text-embedding-3-large`)
//! - `LLM_TEMPERATURE`   = chat temperature (default `0.2`, range `0.0..=2.0`)
//! - `LLM_MAX_TOKENS`    = chat max output tokens (default `1000`)
//! - `LLM_TIMEOUT_SECS`  = request timeout (default `60`)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY` (mandatory)
//! - `OPENAI_URL`     (default `https://api.openai.com`)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (mandatory)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, env_opt_u64, env_or, must_env,
        validate_http_endpoint, validate_range_f32,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Reads `LLM_KIND` (defaults to OpenAI).
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    Ok(env_or("LLM_KIND", "openai").parse::<LlmProvider>()?)
}

/// Builds the **chat** profile for the provider chosen by `LLM_KIND`.
pub fn chat_config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env()?;
    let (endpoint, api_key) = endpoint_and_key(provider)?;

    let model = env_or("CHAT_MODEL", DEFAULT_CHAT_MODEL);
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
    validate_range_f32("temperature", temperature, 0.0, 2.0)?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);
    let timeout_secs = env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);

    let cfg = LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: Some(max_tokens),
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(timeout_secs),
    };
    ensure_model(&cfg)?;
    Ok(cfg)
}

/// Builds the **embedding** profile for the provider chosen by `LLM_KIND`.
///
/// Deterministic: no sampling parameters are sent.
pub fn embedding_config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env()?;
    let (endpoint, api_key) = endpoint_and_key(provider)?;

    let cfg = LlmModelConfig {
        provider,
        model: env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
        endpoint,
        api_key,
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    };
    ensure_model(&cfg)?;
    Ok(cfg)
}

fn endpoint_and_key(provider: LlmProvider) -> Result<(String, Option<String>), AiLlmError> {
    match provider {
        LlmProvider::OpenAI => {
            let endpoint = env_or("OPENAI_URL", DEFAULT_OPENAI_URL);
            validate_http_endpoint("OPENAI_URL", &endpoint)?;
            Ok((endpoint, Some(must_env("OPENAI_API_KEY")?)))
        }
        LlmProvider::Ollama => Ok((ollama_endpoint()?, None)),
    }
}

/// Resolves the Ollama endpoint.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            validate_http_endpoint("OLLAMA_URL", url.trim())?;
            return Ok(url.trim().to_string());
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn ensure_model(cfg: &LlmModelConfig) -> Result<(), AiLlmError> {
    if cfg.model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }
    Ok(())
}
