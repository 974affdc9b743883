//! Typed error for the contextor crate.

use rag_store::RagError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Question empty after trimming, too short or too long.
    #[error("question must be {min}..={max} characters, got {len}")]
    InvalidQuestion { len: usize, min: usize, max: usize },

    /// The language model failed, timed out or returned nothing usable.
    #[error("answer generation failed: {0}")]
    AnswerGeneration(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Errors from the underlying rag-store crate.
    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ContextorError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ContextorError::InvalidQuestion { .. } => "INVALID_QUESTION",
            ContextorError::AnswerGeneration(_) => "ANSWER_GENERATION_ERROR",
            ContextorError::InvalidConfiguration(_) => "CONFIG_ERROR",
            ContextorError::Rag(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_pass_through_rag_errors() {
        let e: ContextorError = RagError::EmbeddingService("down".into()).into();
        assert_eq!(e.code(), "EMBEDDING_SERVICE_ERROR");
        assert_eq!(e.to_string(), RagError::EmbeddingService("down".into()).to_string());
        assert_eq!(
            ContextorError::InvalidQuestion { len: 1, min: 3, max: 500 }.code(),
            "INVALID_QUESTION"
        );
    }
}
