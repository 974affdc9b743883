//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for chunking, embedding, indexing and ingestion.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration (fatal at startup).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Caller-supplied request data is unusable (e.g. blank dept/year).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The document produced no usable text.
    #[error("document '{source_id}' contains no usable text")]
    EmptyDocument { source_id: String },

    /// The document could not be fetched or turned into text.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Transport, auth, timeout or malformed-response failure of the embedding service.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// Failure reported by the vector index or a violated index-side invariant.
    #[error("index service error: {0}")]
    IndexService(String),

    /// A vector does not match the configured index dimension.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// The index acknowledged fewer vectors than were sent.
    #[error("partial write: expected {expected} vectors, index stored {written}")]
    PartialWrite { expected: usize, written: usize },
}

impl RagError {
    /// Stable machine-readable code, used by transports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::InvalidConfiguration(_) => "CONFIG_ERROR",
            RagError::InvalidInput(_) => "BAD_REQUEST",
            RagError::EmptyDocument { .. } => "EMPTY_DOCUMENT",
            RagError::Extraction(_) => "EXTRACTION_FAILED",
            RagError::EmbeddingService(_) => "EMBEDDING_SERVICE_ERROR",
            RagError::IndexService(_) => "INDEX_SERVICE_ERROR",
            RagError::VectorSizeMismatch { .. } => "VECTOR_SIZE_MISMATCH",
            RagError::PartialWrite { .. } => "PARTIAL_WRITE",
        }
    }
}

impl From<qdrant_client::QdrantError> for RagError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        RagError::IndexService(err.to_string())
    }
}

impl From<ai_llm_service::AiLlmError> for RagError {
    fn from(err: ai_llm_service::AiLlmError) -> Self {
        RagError::EmbeddingService(err.to_string())
    }
}
