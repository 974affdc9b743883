//! End-to-end ingestion: fetch → extract + clean → chunk → embed → replace in index.
//!
//! A failure carries the stage it happened in. The previous version of a
//! document is removed only after its replacement vectors are ready.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span};

use crate::chunker::{Chunk, chunk_with};
use crate::config::ChunkingConfig;
use crate::embed::EmbeddingGateway;
use crate::errors::RagError;
use crate::extract::{DocumentRef, TextExtractor};
use crate::ids::vector_id;
use crate::index::IndexGateway;
use crate::normalize::{clean_text, normalize_value};
use crate::progress::Progress;
use crate::record::{ChunkMetadata, DOC_TYPE_SYLLABUS, IndexedVector, MetadataFilter, keys};
use crate::syllabus::{SectionIndex, SubjectInfo, detect_section_type};

/// Position of an ingestion run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Fetching,
    Extracting,
    Chunking,
    Embedding,
    Upserting,
    Done,
    Failed,
}

impl IngestStage {
    /// Stages that do work, in order.
    pub const WORK: [IngestStage; 5] = [
        IngestStage::Fetching,
        IngestStage::Extracting,
        IngestStage::Chunking,
        IngestStage::Embedding,
        IngestStage::Upserting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Fetching => "fetching",
            IngestStage::Extracting => "extracting",
            IngestStage::Chunking => "chunking",
            IngestStage::Embedding => "embedding",
            IngestStage::Upserting => "upserting",
            IngestStage::Done => "done",
            IngestStage::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document plus the attributes it is filed under.
#[derive(Clone, Debug)]
pub struct IngestRequest {
    pub document: DocumentRef,
    pub dept: String,
    pub year: String,
    pub course_code: Option<String>,
    pub semester: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IngestionResult {
    pub chunks_processed: usize,
    pub vectors_stored: usize,
}

/// Terminal `Failed` state: the stage that failed and why.
#[derive(Debug, Error)]
#[error("ingestion failed during {stage}: {error}")]
pub struct IngestFailure {
    pub stage: IngestStage,
    #[source]
    pub error: RagError,
}

fn at(stage: IngestStage) -> impl FnOnce(RagError) -> IngestFailure {
    move |error| IngestFailure { stage, error }
}

/// Orchestrates extractor, chunker, embedding gateway and index gateway.
pub struct IngestionPipeline {
    chunking: ChunkingConfig,
    extractor: Arc<dyn TextExtractor>,
    embedder: EmbeddingGateway,
    index: IndexGateway,
}

impl IngestionPipeline {
    /// # Errors
    /// [`RagError::InvalidConfiguration`] if chunking is invalid or the
    /// embedding and index dimensions differ.
    pub fn new(
        chunking: ChunkingConfig,
        extractor: Arc<dyn TextExtractor>,
        embedder: EmbeddingGateway,
        index: IndexGateway,
    ) -> Result<Self, RagError> {
        chunking.validate()?;
        if embedder.dim() != index.dim() {
            return Err(RagError::InvalidConfiguration(format!(
                "embedding dim {} differs from index dim {}",
                embedder.dim(),
                index.dim()
            )));
        }
        Ok(Self {
            chunking,
            extractor,
            embedder,
            index,
        })
    }

    pub fn index(&self) -> &IndexGateway {
        &self.index
    }

    /// Ingests one document, replacing any earlier version of the same
    /// `{dept, year, source}`.
    ///
    /// Callers must not run two ingestions for the same `{dept, year}` at once.
    pub async fn ingest(
        &self,
        req: &IngestRequest,
        progress: &dyn Progress,
    ) -> Result<IngestionResult, IngestFailure> {
        let source = req.document.source_id();
        let span = info_span!("ingest", dept = %req.dept, year = %req.year, %source);

        async {
            let started = Instant::now();

            match self.run(req, &source, progress).await {
                Ok(result) => {
                    progress.finish(IngestStage::Done);
                    info!(
                        chunks = result.chunks_processed,
                        stored = result.vectors_stored,
                        latency_ms = started.elapsed().as_millis(),
                        "ingestion done"
                    );
                    Ok(result)
                }
                Err(failure) => {
                    progress.finish(IngestStage::Failed);
                    error!(
                        stage = %failure.stage,
                        code = failure.error.code(),
                        error = %failure.error,
                        latency_ms = started.elapsed().as_millis(),
                        "ingestion failed"
                    );
                    Err(failure)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        req: &IngestRequest,
        source: &str,
        progress: &dyn Progress,
    ) -> Result<IngestionResult, IngestFailure> {
        let dept = normalize_value(&req.dept);
        let year = normalize_value(&req.year);
        if dept.is_empty() || year.is_empty() || source.is_empty() {
            return Err(at(IngestStage::Fetching)(RagError::InvalidInput(
                "dept, year and document source are required".into(),
            )));
        }

        enter(progress, IngestStage::Fetching);
        let bytes = self
            .extractor
            .fetch(&req.document)
            .await
            .map_err(at(IngestStage::Fetching))?;

        enter(progress, IngestStage::Extracting);
        let raw = self
            .extractor
            .extract(&req.document, bytes)
            .await
            .map_err(at(IngestStage::Extracting))?;
        let text = clean_text(&raw);
        if text.is_empty() {
            return Err(at(IngestStage::Extracting)(RagError::EmptyDocument {
                source_id: source.to_string(),
            }));
        }

        enter(progress, IngestStage::Chunking);
        let chunks = chunk_with(&text, &self.chunking).map_err(at(IngestStage::Chunking))?;
        if chunks.is_empty() {
            return Err(at(IngestStage::Chunking)(RagError::EmptyDocument {
                source_id: source.to_string(),
            }));
        }

        enter(progress, IngestStage::Embedding);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(at(IngestStage::Embedding))?;

        enter(progress, IngestStage::Upserting);
        let doc = DocumentContext::new(req, &dept, &year, source, &text);
        let records: Vec<IndexedVector> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| doc.record(chunk, vector))
            .collect();

        let stale = MetadataFilter::scope(&dept, &year).with_exact(keys::SOURCE, source);
        let removed = self
            .index
            .delete_by_filter(&stale)
            .await
            .map_err(at(IngestStage::Upserting))?;
        if removed > 0 {
            info!(removed, "replaced previous version");
        }

        let written = self
            .index
            .upsert(&records)
            .await
            .map_err(at(IngestStage::Upserting))?;
        if written != records.len() {
            return Err(at(IngestStage::Upserting)(RagError::PartialWrite {
                expected: records.len(),
                written,
            }));
        }

        Ok(IngestionResult {
            chunks_processed: chunks.len(),
            vectors_stored: written,
        })
    }

    /// Removes every vector filed under `{dept, year}`.
    pub async fn delete(&self, dept: &str, year: &str) -> Result<u64, RagError> {
        self.index
            .delete_by_filter(&MetadataFilter::scope(dept, year))
            .await
    }
}

fn enter(progress: &dyn Progress, stage: IngestStage) {
    info!(stage = %stage, "ingestion stage");
    progress.stage(stage);
}

/// Per-document values shared by all chunk records.
struct DocumentContext<'a> {
    dept: &'a str,
    year: &'a str,
    source: &'a str,
    semester: Option<String>,
    course_code: Option<String>,
    sections: SectionIndex,
}

impl<'a> DocumentContext<'a> {
    fn new(req: &IngestRequest, dept: &'a str, year: &'a str, source: &'a str, text: &str) -> Self {
        let given = |v: &Option<String>| {
            v.as_deref()
                .map(normalize_value)
                .filter(|v| !v.is_empty())
        };
        // an explicit code wins; otherwise take the first one found in the text
        let course_code = given(&req.course_code).or_else(|| {
            SubjectInfo::extract(text)
                .course_code
                .map(|c| normalize_value(&c))
        });

        Self {
            dept,
            year,
            source,
            semester: given(&req.semester),
            course_code,
            sections: SectionIndex::build(text),
        }
    }

    fn record(&self, chunk: &Chunk, vector: Vec<f32>) -> IndexedVector {
        IndexedVector {
            id: vector_id(self.dept, self.year, self.source, chunk.index),
            vector,
            metadata: ChunkMetadata {
                dept: self.dept.to_string(),
                year: self.year.to_string(),
                semester: self.semester.clone(),
                course_code: self.course_code.clone(),
                doc_type: DOC_TYPE_SYLLABUS.to_string(),
                source: self.source.to_string(),
                chunk_text: chunk.text.clone(),
                chunk_index: chunk.index,
                char_start: chunk.char_start,
                char_end: chunk.char_end,
                section: self.sections.header_at(chunk.char_start).to_string(),
                section_type: detect_section_type(&chunk.text).as_str().to_string(),
                course_info: SubjectInfo::extract(&chunk.text).to_map(),
            },
        }
    }
}
