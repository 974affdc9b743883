//! Embedding gateway: batching, concurrency, timeouts and shape checks on top
//! of a pluggable [`EmbeddingsProvider`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, instrument};

use crate::config::EmbeddingConfig;
use crate::embed_pool::embed_in_batches;
use crate::errors::RagError;

pub mod llm_embedder;

/// Asynchronous embedding backend.
///
/// Implementations send one request per call and must return one vector per
/// input, in input order. Batch splitting, timeouts and dimension checks are
/// done by [`EmbeddingGateway`].
pub trait EmbeddingsProvider: Send + Sync {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>>;
}

/// Converts text into fixed-dimension vectors.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingsProvider>,
    dim: usize,
    max_batch: usize,
    concurrency: usize,
    timeout: Duration,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingsProvider>, cfg: &EmbeddingConfig) -> Self {
        Self {
            provider,
            dim: cfg.dim,
            max_batch: cfg.max_batch.max(1),
            concurrency: cfg.concurrency.max(1),
            timeout: cfg.timeout,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embeds a single text (one service call).
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop()
            .ok_or_else(|| RagError::EmbeddingService("empty embedding response".into()))
    }

    /// Embeds `texts` preserving order; one vector per input.
    ///
    /// Inputs larger than the configured batch size are split into several
    /// service calls, run concurrently up to the configured limit.
    ///
    /// # Errors
    /// [`RagError::EmbeddingService`] on transport failure, timeout, wrong
    /// vector count or wrong vector length.
    #[instrument(skip_all, fields(texts = texts.len(), dim = self.dim))]
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = embed_in_batches(
            self.provider.as_ref(),
            texts,
            self.max_batch,
            self.concurrency,
            self.timeout,
        )
        .await?;

        if vectors.len() != texts.len() {
            return Err(RagError::EmbeddingService(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != self.dim) {
            return Err(RagError::EmbeddingService(format!(
                "malformed response: vector {i} has length {}, want {}",
                v.len(),
                self.dim
            )));
        }

        debug!(vectors = vectors.len(), "embeddings ready");
        Ok(vectors)
    }
}
