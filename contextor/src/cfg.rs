//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use ai_llm_service::GenerationParams;
use rag_store::{DistanceKind, env_parse};

use crate::confidence::ConfidencePolicy;
use crate::error::ContextorError;

/// Knobs of the answer pipeline. All fields have defaults via `from_env`.
#[derive(Clone, Debug)]
pub struct ContextorConfig {
    /// Matches requested from the index.
    pub top_k: usize,
    /// Character budget of the context block.
    pub max_ctx_chars: usize,
    pub question_min_chars: usize,
    pub question_max_chars: usize,
    pub confidence: ConfidencePolicy,
    /// Per-call overrides; `None` keeps the chat profile's values.
    pub generation: GenerationParams,
    pub chat_timeout: Duration,
}

impl ContextorConfig {
    /// Defaults with thresholds calibrated for `metric`.
    pub fn new(metric: DistanceKind) -> Self {
        Self {
            top_k: 50,
            max_ctx_chars: 12_000,
            question_min_chars: 3,
            question_max_chars: 500,
            confidence: ConfidencePolicy::new(metric),
            generation: GenerationParams::default(),
            chat_timeout: Duration::from_secs(60),
        }
    }

    /// Reads the answering variables; `CONFIDENCE_METRIC` defaults to the
    /// index metric and must agree with it.
    pub fn from_env(index_metric: DistanceKind) -> Result<Self, ContextorError> {
        let d = Self::new(index_metric);
        let cfg = Self {
            top_k: env_parse("RAG_TOP_K", d.top_k)?,
            max_ctx_chars: env_parse("MAX_CTX_CHARS", d.max_ctx_chars)?,
            question_min_chars: env_parse("QUESTION_MIN_CHARS", d.question_min_chars)?,
            question_max_chars: env_parse("QUESTION_MAX_CHARS", d.question_max_chars)?,
            confidence: ConfidencePolicy {
                metric: env_parse("CONFIDENCE_METRIC", index_metric)?,
                high: env_parse("CONFIDENCE_HIGH", d.confidence.high)?,
                medium: env_parse("CONFIDENCE_MEDIUM", d.confidence.medium)?,
            },
            generation: d.generation,
            chat_timeout: Duration::from_secs(env_parse("CHAT_TIMEOUT_SECS", 60u64)?),
        };
        cfg.validate(index_metric)?;
        Ok(cfg)
    }

    pub fn validate(&self, index_metric: DistanceKind) -> Result<(), ContextorError> {
        if self.top_k == 0 || self.max_ctx_chars == 0 {
            return Err(ContextorError::InvalidConfiguration(
                "RAG_TOP_K and MAX_CTX_CHARS must be > 0".into(),
            ));
        }
        if self.question_min_chars == 0 || self.question_min_chars > self.question_max_chars {
            return Err(ContextorError::InvalidConfiguration(format!(
                "question length bounds {}..={} are invalid",
                self.question_min_chars, self.question_max_chars
            )));
        }
        self.confidence.validate(index_metric)
    }
}
