//! Syllabus ingestion core: chunking, embeddings, vector index and the
//! ingestion pipeline.
//!
//! This crate provides:
//! - A deterministic chunker with char offsets ([`chunk`], [`chunk_with`])
//! - An embedding gateway with batching and timeouts ([`EmbeddingGateway`])
//! - A vector index gateway over Qdrant or memory ([`IndexGateway`])
//! - The ingestion pipeline ([`IngestionPipeline`])
//!
//! [`RagStore`] wires all of it from a [`RagConfig`].

mod chunker;
mod config;
mod distance;
mod embed;
mod embed_pool;
mod errors;
mod extract;
mod filters;
mod ids;
mod index;
mod ingest;
mod memory_index;
mod normalize;
mod progress;
mod qdrant_facade;
mod record;
mod syllabus;

pub use chunker::{Chunk, chunk, chunk_with};
pub use config::{
    ChunkStrategy, ChunkingConfig, DistanceKind, EmbeddingConfig, ExtractConfig, IndexBackend,
    IndexConfig, RagConfig, env_opt, env_parse, env_string,
};
pub use embed::llm_embedder::LlmEmbedder;
pub use embed::{EmbeddingGateway, EmbeddingsProvider};
pub use errors::RagError;
pub use extract::{DocumentExtractor, DocumentRef, TextExtractor};
pub use ids::{stable_uuid, vector_id};
pub use index::{IndexGateway, VectorIndex};
pub use ingest::{IngestFailure, IngestRequest, IngestStage, IngestionPipeline, IngestionResult};
pub use memory_index::InMemoryIndex;
pub use normalize::{clean_text, normalize_value};
pub use progress::{IndicatifProgress, NoopProgress, Progress};
pub use qdrant_facade::QdrantIndex;
pub use record::{
    ChunkMetadata, DOC_TYPE_SYLLABUS, IndexedVector, MetadataFilter, RetrievalMatch, keys,
};
pub use syllabus::{SectionIndex, SectionKind, SubjectInfo, detect_section_type};

use std::sync::Arc;

use tracing::info;

/// High-level facade that wires configuration, gateways and the pipeline.
///
/// This is the single entry point recommended for application code.
pub struct RagStore {
    cfg: RagConfig,
    embedder: EmbeddingGateway,
    index: IndexGateway,
    ingestion: Arc<IngestionPipeline>,
}

impl RagStore {
    /// Connects the configured index (creating it if needed) and builds the
    /// default document extractor.
    ///
    /// # Errors
    /// `InvalidConfiguration` on bad config or an incompatible existing index,
    /// `IndexService` if the index is unreachable.
    pub async fn connect(
        cfg: RagConfig,
        provider: Arc<dyn EmbeddingsProvider>,
    ) -> Result<Self, RagError> {
        let extractor = Arc::new(DocumentExtractor::new(&cfg.extract)?);
        Self::connect_with(cfg, provider, extractor).await
    }

    /// Like [`RagStore::connect`] with a caller-supplied extractor.
    pub async fn connect_with(
        cfg: RagConfig,
        provider: Arc<dyn EmbeddingsProvider>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self, RagError> {
        cfg.validate()?;
        let index = IndexGateway::connect(&cfg.index).await?;
        let embedder = EmbeddingGateway::new(provider, &cfg.embedding);
        let ingestion = Arc::new(IngestionPipeline::new(
            cfg.chunking.clone(),
            extractor,
            embedder.clone(),
            index.clone(),
        )?);
        info!(
            backend = index.backend_name(),
            dim = cfg.embedding.dim,
            chunk_size = cfg.chunking.size,
            chunk_overlap = cfg.chunking.overlap,
            "rag store ready"
        );
        Ok(Self {
            cfg,
            embedder,
            index,
            ingestion,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    pub fn embedder(&self) -> &EmbeddingGateway {
        &self.embedder
    }

    pub fn index(&self) -> &IndexGateway {
        &self.index
    }

    pub fn ingestion(&self) -> Arc<IngestionPipeline> {
        Arc::clone(&self.ingestion)
    }
}
