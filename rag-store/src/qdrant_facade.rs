//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! All Qdrant interactions live behind [`QdrantIndex`], which hides the
//! builder API and keeps the rest of the crate decoupled from `qdrant-client`.

use std::collections::HashMap;

use futures::future::BoxFuture;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, ListValue,
    PointId, PointStruct, SearchParamsBuilder, SearchPointsBuilder, Struct, UpdateStatus,
    UpsertPointsBuilder, Value as QValue, VectorParamsBuilder, value::Kind, vectors_config,
};
use tracing::{debug, info, warn};

use crate::config::{DistanceKind, IndexConfig};
use crate::distance::distance_to_similarity;
use crate::errors::RagError;
use crate::filters::to_qdrant_filter;
use crate::index::VectorIndex;
use crate::record::{ChunkMetadata, IndexedVector, MetadataFilter, RetrievalMatch};

/// Qdrant-backed [`VectorIndex`] over one collection.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    metric: DistanceKind,
    exact: bool,
}

impl QdrantIndex {
    /// Creates the client. No request is sent until the first call.
    pub fn new(cfg: &IndexConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::InvalidConfiguration(format!("qdrant client: {e}")))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            metric: cfg.metric,
            exact: cfg.exact_search,
        })
    }

    async fn ensure_collection(&self, dim: usize, metric: DistanceKind) -> Result<(), RagError> {
        let want = to_qdrant_distance(metric);

        if self.client.collection_exists(&self.collection).await? {
            let info = self.client.collection_info(&self.collection).await?;
            let params = info
                .result
                .and_then(|r| r.config)
                .and_then(|c| c.params)
                .and_then(|p| p.vectors_config)
                .and_then(|v| v.config);

            return match params {
                Some(vectors_config::Config::Params(p)) => {
                    if p.size as usize != dim {
                        return Err(RagError::InvalidConfiguration(format!(
                            "collection '{}' has dimension {}, configured {dim}",
                            self.collection, p.size
                        )));
                    }
                    if p.distance != want as i32 {
                        return Err(RagError::InvalidConfiguration(format!(
                            "collection '{}' uses another distance than {}",
                            self.collection,
                            metric.as_str()
                        )));
                    }
                    debug!(collection = %self.collection, "collection already exists");
                    Ok(())
                }
                Some(vectors_config::Config::ParamsMap(_)) => Err(RagError::InvalidConfiguration(
                    format!("collection '{}' uses named vectors", self.collection),
                )),
                None => Err(RagError::IndexService(format!(
                    "collection '{}' reported no vector params",
                    self.collection
                ))),
            };
        }

        info!(collection = %self.collection, dim, metric = metric.as_str(), "creating collection");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, want)),
            )
            .await?;
        Ok(())
    }

    async fn upsert_points(&self, vectors: &[IndexedVector]) -> Result<usize, RagError> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let mut points = Vec::with_capacity(vectors.len());
        for v in vectors {
            let payload = metadata_to_payload(&v.metadata)?;
            points.push(PointStruct {
                id: Some(PointId::from(v.id.clone())),
                payload,
                vectors: Some(v.vector.clone().into()),
                ..Default::default()
            });
        }

        let res = self
            .client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        let status = res.result.map(|r| r.status);
        let written = match status {
            Some(s) if s == UpdateStatus::Completed as i32 || s == UpdateStatus::Acknowledged as i32 => {
                vectors.len()
            }
            _ => 0,
        };
        debug!(collection = %self.collection, sent = vectors.len(), written, ?status, "qdrant upsert");
        Ok(written)
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<RetrievalMatch>, RagError> {
        let mut builder = SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
            .with_payload(true);
        if let Some(f) = to_qdrant_filter(filter) {
            builder = builder.filter(f);
        }
        if self.exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self.client.search_points(builder).await?;

        let mut out = Vec::with_capacity(res.result.len());
        for point in res.result {
            let id = point.id.map(point_id_to_string).unwrap_or_default();
            let payload = qpayload_to_json(point.payload);
            let metadata: ChunkMetadata = match serde_json::from_value(payload) {
                Ok(m) => m,
                Err(e) => {
                    warn!(%id, error = %e, "skipping point with foreign payload");
                    continue;
                }
            };
            let score = match self.metric {
                DistanceKind::Euclid => distance_to_similarity(point.score),
                DistanceKind::Cosine | DistanceKind::Dot => point.score,
            };
            out.push(RetrievalMatch {
                id,
                score,
                metadata,
            });
        }

        debug!(collection = %self.collection, hits = out.len(), "qdrant search");
        Ok(out)
    }

    async fn count_points(&self, filter: &MetadataFilter) -> Result<u64, RagError> {
        let mut builder = CountPointsBuilder::new(&self.collection).exact(true);
        if let Some(f) = to_qdrant_filter(filter) {
            builder = builder.filter(f);
        }
        let res = self.client.count(builder).await?;
        Ok(res.result.map(|r| r.count).unwrap_or(0))
    }

    async fn delete_points(&self, filter: &MetadataFilter) -> Result<u64, RagError> {
        let Some(f) = to_qdrant_filter(filter) else {
            return Err(RagError::IndexService("refusing unfiltered delete".into()));
        };
        let matching = self.count_points(filter).await?;
        if matching == 0 {
            return Ok(0);
        }
        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(f).wait(true))
            .await?;
        Ok(matching)
    }
}

impl VectorIndex for QdrantIndex {
    fn name(&self) -> &'static str {
        "qdrant"
    }

    fn ensure(&self, dim: usize, metric: DistanceKind) -> BoxFuture<'_, Result<(), RagError>> {
        Box::pin(self.ensure_collection(dim, metric))
    }

    fn upsert<'a>(&'a self, vectors: &'a [IndexedVector]) -> BoxFuture<'a, Result<usize, RagError>> {
        Box::pin(self.upsert_points(vectors))
    }

    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: usize,
        filter: &'a MetadataFilter,
    ) -> BoxFuture<'a, Result<Vec<RetrievalMatch>, RagError>> {
        Box::pin(self.search(vector, top_k, filter))
    }

    fn delete<'a>(&'a self, filter: &'a MetadataFilter) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(self.delete_points(filter))
    }

    fn count<'a>(&'a self, filter: &'a MetadataFilter) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(self.count_points(filter))
    }

    fn health(&self) -> BoxFuture<'_, Result<(), RagError>> {
        Box::pin(async move {
            self.client.health_check().await?;
            Ok(())
        })
    }
}

fn to_qdrant_distance(metric: DistanceKind) -> Distance {
    match metric {
        DistanceKind::Cosine => Distance::Cosine,
        DistanceKind::Dot => Distance::Dot,
        DistanceKind::Euclid => Distance::Euclid,
    }
}

fn point_id_to_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(s)) => s,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn metadata_to_payload(meta: &ChunkMetadata) -> Result<HashMap<String, QValue>, RagError> {
    match serde_json::to_value(meta) {
        Ok(serde_json::Value::Object(map)) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, json_to_qvalue(v)))
            .collect()),
        Ok(other) => Err(RagError::IndexService(format!(
            "metadata serialized to non-object: {other}"
        ))),
        Err(e) => Err(RagError::IndexService(format!("metadata serialization: {e}"))),
    }
}

fn json_to_qvalue(v: serde_json::Value) -> QValue {
    let kind = match v {
        serde_json::Value::String(s) => Some(Kind::StringValue(s)),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(Kind::IntegerValue(i)),
            (None, Some(f)) => Some(Kind::DoubleValue(f)),
            (None, None) => Some(Kind::StringValue(n.to_string())),
        },
        serde_json::Value::Bool(b) => Some(Kind::BoolValue(b)),
        serde_json::Value::Array(arr) => Some(Kind::ListValue(ListValue {
            values: arr.into_iter().map(json_to_qvalue).collect(),
        })),
        serde_json::Value::Object(map) => Some(Kind::StructValue(Struct {
            fields: map.into_iter().map(|(k, v)| (k, json_to_qvalue(v))).collect(),
        })),
        serde_json::Value::Null => None,
    };
    QValue { kind }
}

/// Converts a Qdrant payload into JSON, nested lists and structs included.
fn qpayload_to_json(p: HashMap<String, QValue>) -> serde_json::Value {
    serde_json::Value::Object(
        p.into_iter()
            .map(|(k, v)| (k, qvalue_to_json(v)))
            .collect(),
    )
}

fn qvalue_to_json(v: QValue) -> serde_json::Value {
    match v.kind {
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::ListValue(l)) => {
            serde_json::Value::Array(l.values.into_iter().map(qvalue_to_json).collect())
        }
        Some(Kind::StructValue(s)) => qpayload_to_json(s.fields),
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn metadata_survives_payload_conversion() {
        let mut course_info = BTreeMap::new();
        course_info.insert("credits".to_string(), "4".to_string());
        let meta = ChunkMetadata {
            dept: "cs".into(),
            year: "2024".into(),
            semester: Some("iii".into()),
            course_code: Some("cs-301".into()),
            doc_type: "syllabus".into(),
            source: "https://uni.example/cs.pdf".into(),
            chunk_text: "Mid term: 30 marks".into(),
            chunk_index: 7,
            char_start: 2800,
            char_end: 3300,
            section: "3. Evaluation".into(),
            section_type: "evaluation".into(),
            course_info,
        };
        let payload = metadata_to_payload(&meta).unwrap();
        assert!(matches!(
            payload.get("chunk_index").and_then(|v| v.kind.clone()),
            Some(Kind::IntegerValue(7))
        ));
        let back: ChunkMetadata = serde_json::from_value(qpayload_to_json(payload)).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn point_ids_render_as_strings() {
        let id = PointId::from("0b5e7c9a-2f7c-5b6e-9a57-1d3c2c0e8f10".to_string());
        assert_eq!(point_id_to_string(id), "0b5e7c9a-2f7c-5b6e-9a57-1d3c2c0e8f10");
        assert_eq!(point_id_to_string(PointId::from(42u64)), "42");
    }
}
