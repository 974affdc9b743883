//! Runtime configuration: chunking, embedding, index and extraction knobs.
//!
//! Everything is built once (usually via [`RagConfig::from_env`]) and passed
//! into the pipelines at construction.

use std::str::FromStr;
use std::time::Duration;

use crate::errors::RagError;

/// Similarity metric of the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine similarity (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2), reported as `1 / (1 + d)`.
    Euclid,
}

impl DistanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceKind::Cosine => "cosine",
            DistanceKind::Dot => "dot",
            DistanceKind::Euclid => "euclidean",
        }
    }
}

impl FromStr for DistanceKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" | "dotproduct" => Ok(Self::Dot),
            "euclid" | "euclidean" | "l2" => Ok(Self::Euclid),
            other => Err(RagError::InvalidConfiguration(format!(
                "unknown metric '{other}' (expected cosine, dot or euclidean)"
            ))),
        }
    }
}

/// How text is cut into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Fixed character windows with `size - overlap` stride.
    Fixed,
    /// Sentences greedily packed up to `size`, overlap carried from the previous chunk.
    Sentence,
}

impl FromStr for ChunkStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "chars" => Ok(Self::Fixed),
            "sentence" | "sentences" => Ok(Self::Sentence),
            other => Err(RagError::InvalidConfiguration(format!(
                "unknown chunk strategy '{other}' (expected fixed or sentence)"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub size: usize,
    /// Characters shared by consecutive chunks.
    pub overlap: usize,
    pub strategy: ChunkStrategy,
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), RagError> {
        if self.size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk size must be > 0".into(),
            ));
        }
        if self.overlap >= self.size {
            return Err(RagError::InvalidConfiguration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 500,
            overlap: 100,
            strategy: ChunkStrategy::Fixed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    /// Output dimension of the embedding model.
    pub dim: usize,
    /// Max texts per service call.
    pub max_batch: usize,
    /// Max service calls in flight per `embed_batch`.
    pub concurrency: usize,
    /// Deadline per service call.
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dim: 3072,
            max_batch: 64,
            concurrency: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Which vector store backs the index gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexBackend {
    Qdrant,
    /// In-process store; contents are lost on restart.
    Memory,
}

impl FromStr for IndexBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(RagError::InvalidConfiguration(format!(
                "unknown vector backend '{other}' (expected qdrant or memory)"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub metric: DistanceKind,
    /// Vector length every stored/queried vector must have.
    pub dim: usize,
    /// Points per upsert request.
    pub upsert_batch: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    /// Deadline per backend call.
    pub timeout: Duration,
}

impl IndexConfig {
    /// Defaults for a given backend and dimension.
    pub fn new_default(backend: IndexBackend, dim: usize) -> Self {
        Self {
            backend,
            qdrant_url: "http://127.0.0.1:6334".into(),
            qdrant_api_key: None,
            collection: "studentpath-syllabus".into(),
            metric: DistanceKind::Cosine,
            dim,
            upsert_batch: 100,
            exact_search: false,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.dim == 0 {
            return Err(RagError::InvalidConfiguration("index dimension must be > 0".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::InvalidConfiguration("upsert_batch must be > 0".into()));
        }
        if self.backend == IndexBackend::Qdrant {
            if self.qdrant_url.trim().is_empty() {
                return Err(RagError::InvalidConfiguration("qdrant_url is empty".into()));
            }
            if self.collection.trim().is_empty() {
                return Err(RagError::InvalidConfiguration("collection is empty".into()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ExtractConfig {
    pub fetch_timeout: Duration,
    /// Documents larger than this are rejected before parsing.
    pub max_bytes: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Complete configuration of the ingestion/retrieval core.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub extract: ExtractConfig,
}

impl RagConfig {
    /// Reads every knob from the environment, falling back to defaults.
    ///
    /// # Errors
    /// [`RagError::InvalidConfiguration`] if a variable is set but unparsable,
    /// or if the resulting config fails validation.
    pub fn from_env() -> Result<Self, RagError> {
        let dim = env_parse("EMBEDDING_DIM", 3072usize)?;

        let chunking = ChunkingConfig {
            size: env_parse("CHUNK_SIZE", 500usize)?,
            overlap: env_parse("CHUNK_OVERLAP", 100usize)?,
            strategy: env_parse("CHUNK_STRATEGY", ChunkStrategy::Fixed)?,
        };

        let embedding = EmbeddingConfig {
            dim,
            max_batch: env_parse("EMBEDDING_MAX_BATCH", 64usize)?,
            concurrency: env_parse("EMBEDDING_CONCURRENCY", 4usize)?,
            timeout: Duration::from_secs(env_parse("EMBEDDING_TIMEOUT_SECS", 30u64)?),
        };

        let defaults = IndexConfig::new_default(IndexBackend::Qdrant, dim);
        let index = IndexConfig {
            backend: env_parse("VECTOR_BACKEND", IndexBackend::Qdrant)?,
            qdrant_url: env_string("QDRANT_URL", &defaults.qdrant_url),
            qdrant_api_key: env_opt("QDRANT_API_KEY"),
            collection: env_string("QDRANT_COLLECTION", &defaults.collection),
            metric: env_parse("VECTOR_METRIC", DistanceKind::Cosine)?,
            dim,
            upsert_batch: env_parse("QDRANT_BATCH_SIZE", defaults.upsert_batch)?,
            exact_search: env_parse("RAG_EXACT_SEARCH", false)?,
            timeout: Duration::from_secs(env_parse("INDEX_TIMEOUT_SECS", 30u64)?),
        };

        let extract = ExtractConfig {
            fetch_timeout: Duration::from_secs(env_parse("FETCH_TIMEOUT_SECS", 30u64)?),
            max_bytes: env_parse("MAX_DOCUMENT_BYTES", ExtractConfig::default().max_bytes)?,
        };

        let cfg = Self {
            chunking,
            embedding,
            index,
            extract,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Cross-checks all sections.
    pub fn validate(&self) -> Result<(), RagError> {
        self.chunking.validate()?;
        self.index.validate()?;
        if self.embedding.dim != self.index.dim {
            return Err(RagError::InvalidConfiguration(format!(
                "embedding dim {} differs from index dim {}",
                self.embedding.dim, self.index.dim
            )));
        }
        if self.embedding.max_batch == 0 || self.embedding.concurrency == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding max_batch and concurrency must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/* ---------------- env helpers ---------------- */

/// Value of `key`, or `default` when unset/blank.
pub fn env_string(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Trimmed value of `key`, `None` when unset/blank.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses `key` into `T`; unset means `default`, unparsable is an error.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, RagError> {
    match env_opt(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            RagError::InvalidConfiguration(format!("cannot parse {key}='{raw}'"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_rejects_degenerate_windows() {
        let mut c = ChunkingConfig::default();
        assert!(c.validate().is_ok());
        c.overlap = c.size;
        assert!(matches!(c.validate(), Err(RagError::InvalidConfiguration(_))));
        c.size = 0;
        c.overlap = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn parses_enums() {
        assert_eq!("Euclidean".parse::<DistanceKind>().unwrap(), DistanceKind::Euclid);
        assert_eq!("sentence".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Sentence);
        assert_eq!("memory".parse::<IndexBackend>().unwrap(), IndexBackend::Memory);
        assert!("pinecone".parse::<IndexBackend>().is_err());
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let cfg = RagConfig {
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::new_default(IndexBackend::Memory, 8),
            extract: ExtractConfig::default(),
        };
        assert!(matches!(cfg.validate(), Err(RagError::InvalidConfiguration(_))));
    }
}
