//! In-process vector index for local runs and tests.
//!
//! Brute-force scan over all records; contents are lost on restart.

use std::collections::HashMap;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::DistanceKind;
use crate::distance::score;
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::record::{IndexedVector, MetadataFilter, RetrievalMatch};

pub struct InMemoryIndex {
    metric: DistanceKind,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    dim: Option<usize>,
    /// Insertion order; overwrites keep their original slot.
    records: Vec<IndexedVector>,
    positions: HashMap<String, usize>,
}

impl State {
    fn reindex(&mut self) {
        self.positions = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }
}

impl InMemoryIndex {
    pub fn new(metric: DistanceKind) -> Self {
        Self {
            metric,
            state: RwLock::new(State::default()),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn ensure(&self, dim: usize, metric: DistanceKind) -> BoxFuture<'_, Result<(), RagError>> {
        Box::pin(async move {
            if metric != self.metric {
                return Err(RagError::InvalidConfiguration(format!(
                    "memory index uses {}, requested {}",
                    self.metric.as_str(),
                    metric.as_str()
                )));
            }
            let mut st = self.state.write().await;
            match st.dim {
                Some(existing) if existing != dim => Err(RagError::InvalidConfiguration(format!(
                    "existing index has dimension {existing}, configured {dim}"
                ))),
                _ => {
                    st.dim = Some(dim);
                    Ok(())
                }
            }
        })
    }

    fn upsert<'a>(&'a self, vectors: &'a [IndexedVector]) -> BoxFuture<'a, Result<usize, RagError>> {
        Box::pin(async move {
            let mut st = self.state.write().await;
            for v in vectors {
                match st.positions.get(&v.id).copied() {
                    Some(pos) => st.records[pos] = v.clone(),
                    None => {
                        let pos = st.records.len();
                        st.positions.insert(v.id.clone(), pos);
                        st.records.push(v.clone());
                    }
                }
            }
            debug!(upserted = vectors.len(), total = st.records.len(), "memory upsert");
            Ok(vectors.len())
        })
    }

    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: usize,
        filter: &'a MetadataFilter,
    ) -> BoxFuture<'a, Result<Vec<RetrievalMatch>, RagError>> {
        Box::pin(async move {
            let st = self.state.read().await;
            let mut hits: Vec<RetrievalMatch> = st
                .records
                .iter()
                .filter(|r| filter.matches(&r.metadata))
                .map(|r| RetrievalMatch {
                    id: r.id.clone(),
                    score: score(self.metric, vector, &r.vector),
                    metadata: r.metadata.clone(),
                })
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(top_k);
            Ok(hits)
        })
    }

    fn delete<'a>(&'a self, filter: &'a MetadataFilter) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(async move {
            let mut st = self.state.write().await;
            let before = st.records.len();
            st.records.retain(|r| !filter.matches(&r.metadata));
            let deleted = before - st.records.len();
            if deleted > 0 {
                st.reindex();
            }
            Ok(deleted as u64)
        })
    }

    fn count<'a>(&'a self, filter: &'a MetadataFilter) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(async move {
            let st = self.state.read().await;
            Ok(st
                .records
                .iter()
                .filter(|r| filter.matches(&r.metadata))
                .count() as u64)
        })
    }

    fn health(&self) -> BoxFuture<'_, Result<(), RagError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ChunkMetadata;
    use std::collections::BTreeMap;

    fn rec(id: &str, text: &str) -> IndexedVector {
        IndexedVector {
            id: id.into(),
            vector: vec![1.0, 0.0],
            metadata: ChunkMetadata {
                dept: "cs".into(),
                year: "2024".into(),
                semester: None,
                course_code: None,
                doc_type: "syllabus".into(),
                source: "doc".into(),
                chunk_text: text.into(),
                chunk_index: 0,
                char_start: 0,
                char_end: text.chars().count(),
                section: "general".into(),
                section_type: "general".into(),
                course_info: BTreeMap::new(),
            },
        }
    }

    #[tokio::test]
    async fn upsert_same_id_overwrites() {
        let idx = InMemoryIndex::new(DistanceKind::Cosine);
        idx.upsert(&[rec("a", "old"), rec("b", "keep")]).await.unwrap();
        idx.upsert(&[rec("a", "new")]).await.unwrap();
        assert_eq!(idx.len().await, 2);

        let hits = idx
            .query(&[1.0, 0.0], 10, &MetadataFilter::new())
            .await
            .unwrap();
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].chunk_text(), "new");
    }

    #[tokio::test]
    async fn dimension_is_fixed_after_first_ensure() {
        let idx = InMemoryIndex::new(DistanceKind::Cosine);
        idx.ensure(4, DistanceKind::Cosine).await.unwrap();
        idx.ensure(4, DistanceKind::Cosine).await.unwrap();
        assert!(matches!(
            idx.ensure(8, DistanceKind::Cosine).await,
            Err(RagError::InvalidConfiguration(_))
        ));
        assert!(idx.ensure(4, DistanceKind::Dot).await.is_err());
    }

    #[tokio::test]
    async fn delete_keeps_positions_consistent() {
        let idx = InMemoryIndex::new(DistanceKind::Cosine);
        let mut other = rec("b", "physics");
        other.metadata.dept = "physics".into();
        idx.upsert(&[rec("a", "cs"), other, rec("c", "cs too")]).await.unwrap();

        let deleted = idx.delete(&MetadataFilter::scope("cs", "2024")).await.unwrap();
        assert_eq!(deleted, 2);
        idx.upsert(&[rec("b", "overwritten")]).await.unwrap();
        assert_eq!(idx.len().await, 1);
    }
}
