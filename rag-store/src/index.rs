//! Vector index gateway: the contract every backend implements, plus the
//! checks and timeouts that sit in front of it.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::config::{DistanceKind, IndexBackend, IndexConfig};
use crate::errors::RagError;
use crate::memory_index::InMemoryIndex;
use crate::qdrant_facade::QdrantIndex;
use crate::record::{IndexedVector, MetadataFilter, RetrievalMatch};

/// Storage backend behind [`IndexGateway`].
///
/// Scores returned by `query` must be similarities (higher is better).
/// Results may come in any order; the gateway sorts them.
pub trait VectorIndex: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Creates the index if missing; fails if an existing one has another
    /// dimension or metric.
    fn ensure(&self, dim: usize, metric: DistanceKind) -> BoxFuture<'_, Result<(), RagError>>;

    /// Insert-or-overwrite by id. Returns how many vectors the backend stored.
    fn upsert<'a>(&'a self, vectors: &'a [IndexedVector]) -> BoxFuture<'a, Result<usize, RagError>>;

    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: usize,
        filter: &'a MetadataFilter,
    ) -> BoxFuture<'a, Result<Vec<RetrievalMatch>, RagError>>;

    /// Deletes everything matching `filter`, returning the deleted count.
    fn delete<'a>(&'a self, filter: &'a MetadataFilter) -> BoxFuture<'a, Result<u64, RagError>>;

    fn count<'a>(&'a self, filter: &'a MetadataFilter) -> BoxFuture<'a, Result<u64, RagError>>;

    fn health(&self) -> BoxFuture<'_, Result<(), RagError>>;
}

/// Validating, time-bounded front for a [`VectorIndex`].
#[derive(Clone)]
pub struct IndexGateway {
    backend: Arc<dyn VectorIndex>,
    dim: usize,
    metric: DistanceKind,
    upsert_batch: usize,
    timeout: Duration,
}

impl IndexGateway {
    pub fn new(backend: Arc<dyn VectorIndex>, cfg: &IndexConfig) -> Self {
        Self {
            backend,
            dim: cfg.dim,
            metric: cfg.metric,
            upsert_batch: cfg.upsert_batch.max(1),
            timeout: cfg.timeout,
        }
    }

    /// Builds the configured backend and makes sure the index exists.
    ///
    /// # Errors
    /// [`RagError::InvalidConfiguration`] on bad config or an incompatible
    /// existing index; [`RagError::IndexService`] if the backend is unreachable.
    pub async fn connect(cfg: &IndexConfig) -> Result<Self, RagError> {
        cfg.validate()?;
        let backend: Arc<dyn VectorIndex> = match cfg.backend {
            IndexBackend::Qdrant => Arc::new(QdrantIndex::new(cfg)?),
            IndexBackend::Memory => Arc::new(InMemoryIndex::new(cfg.metric)),
        };
        let gw = Self::new(backend, cfg);
        gw.ensure_index_exists(cfg.dim, cfg.metric).await?;
        Ok(gw)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> DistanceKind {
        self.metric
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Idempotent existence check, run once at startup.
    pub async fn ensure_index_exists(
        &self,
        dim: usize,
        metric: DistanceKind,
    ) -> Result<(), RagError> {
        if dim != self.dim || metric != self.metric {
            return Err(RagError::InvalidConfiguration(format!(
                "index requested as {dim}/{}, gateway configured for {}/{}",
                metric.as_str(),
                self.dim,
                self.metric.as_str()
            )));
        }
        self.timed("ensure", self.backend.ensure(dim, metric)).await?;
        info!(
            backend = self.backend.name(),
            dim,
            metric = metric.as_str(),
            "vector index ready"
        );
        Ok(())
    }

    /// Writes `vectors` in batches; returns the total the backend acknowledged.
    ///
    /// All lengths are checked before the first write.
    pub async fn upsert(&self, vectors: &[IndexedVector]) -> Result<usize, RagError> {
        if let Some(bad) = vectors.iter().find(|v| v.vector.len() != self.dim) {
            return Err(RagError::VectorSizeMismatch {
                got: bad.vector.len(),
                want: self.dim,
            });
        }

        let mut written = 0usize;
        for batch in vectors.chunks(self.upsert_batch) {
            written += self.timed("upsert", self.backend.upsert(batch)).await?;
        }
        debug!(sent = vectors.len(), written, "upsert finished");
        Ok(written)
    }

    /// Top-`top_k` matches under `filter`, best first.
    ///
    /// Equal scores keep the backend's order.
    pub async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<RetrievalMatch>, RagError> {
        if top_k == 0 {
            return Err(RagError::InvalidConfiguration("top_k must be > 0".into()));
        }
        if vector.len() != self.dim {
            return Err(RagError::VectorSizeMismatch {
                got: vector.len(),
                want: self.dim,
            });
        }

        let mut matches = self
            .timed("query", self.backend.query(vector, top_k, filter))
            .await?;
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    /// Deletes vectors matching `filter`.
    ///
    /// # Errors
    /// [`RagError::IndexService`] without touching the index if the filter does
    /// not bind both `dept` and `year`.
    pub async fn delete_by_filter(&self, filter: &MetadataFilter) -> Result<u64, RagError> {
        if !filter.binds_scope() {
            warn!(?filter, "refusing delete without dept and year");
            return Err(RagError::IndexService(
                "delete filter must bind dept and year".into(),
            ));
        }
        let deleted = self.timed("delete", self.backend.delete(filter)).await?;
        info!(deleted, ?filter, "deleted vectors");
        Ok(deleted)
    }

    pub async fn count(&self, filter: &MetadataFilter) -> Result<u64, RagError> {
        self.timed("count", self.backend.count(filter)).await
    }

    pub async fn health(&self) -> Result<(), RagError> {
        self.timed("health", self.backend.health()).await
    }

    async fn timed<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, RagError>>,
    ) -> Result<T, RagError> {
        let started = Instant::now();
        let out = tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            RagError::IndexService(format!(
                "{op} timed out after {}ms",
                self.timeout.as_millis()
            ))
        })?;
        debug!(
            op,
            backend = self.backend.name(),
            ok = out.is_ok(),
            latency_ms = started.elapsed().as_millis(),
            "index call"
        );
        out
    }
}
