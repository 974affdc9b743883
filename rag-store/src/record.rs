//! Core data models: stored metadata, indexed vectors, matches and filters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_value;

/// Payload keys that filters may bind.
pub mod keys {
    pub const DEPT: &str = "dept";
    pub const YEAR: &str = "year";
    pub const SEMESTER: &str = "semester";
    pub const COURSE_CODE: &str = "course_code";
    pub const SOURCE: &str = "source";
    pub const DOC_TYPE: &str = "doc_type";
}

pub const DOC_TYPE_SYLLABUS: &str = "syllabus";

/// Metadata stored next to every vector.
///
/// `dept`, `year`, `semester` and `course_code` hold normalized values
/// (see [`normalize_value`]); everything else is kept as extracted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub dept: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    pub doc_type: String,
    pub source: String,
    pub chunk_text: String,
    pub chunk_index: usize,
    pub char_start: usize,
    pub char_end: usize,
    #[serde(default = "default_section")]
    pub section: String,
    #[serde(default = "default_section")]
    pub section_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub course_info: BTreeMap<String, String>,
}

fn default_section() -> String {
    "general".to_string()
}

impl ChunkMetadata {
    /// Value of a filterable key, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            keys::DEPT => Some(&self.dept),
            keys::YEAR => Some(&self.year),
            keys::SEMESTER => self.semester.as_deref(),
            keys::COURSE_CODE => self.course_code.as_deref(),
            keys::SOURCE => Some(&self.source),
            keys::DOC_TYPE => Some(&self.doc_type),
            _ => None,
        }
    }
}

/// One record of the index.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedVector {
    /// Deterministic per document and chunk, see [`crate::ids::vector_id`].
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A scored hit from a similarity query. Higher scores are better.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

impl RetrievalMatch {
    pub fn chunk_text(&self) -> &str {
        &self.metadata.chunk_text
    }
}

/// Exact-match conjunction over metadata keys.
///
/// Values passed to [`MetadataFilter::with`] are normalized, so callers may
/// pass raw user input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    conditions: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter bound to one department and academic year.
    pub fn scope(dept: &str, year: &str) -> Self {
        Self::new().with(keys::DEPT, dept).with(keys::YEAR, year)
    }

    /// Adds (or replaces) an equality condition.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.conditions
            .insert(key.to_string(), normalize_value(value));
        self
    }

    /// Adds a condition compared verbatim, for values stored as-is (`source`).
    pub fn with_exact(mut self, key: &str, value: &str) -> Self {
        self.conditions.insert(key.to_string(), value.to_string());
        self
    }

    /// Adds the condition only when `value` is present and non-blank.
    pub fn with_opt(self, key: &str, value: Option<&str>) -> Self {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when both `dept` and `year` are bound to non-empty values.
    pub fn binds_scope(&self) -> bool {
        [keys::DEPT, keys::YEAR]
            .iter()
            .all(|k| self.conditions.get(*k).is_some_and(|v| !v.is_empty()))
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Evaluates the filter against stored metadata.
    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        self.conditions
            .iter()
            .all(|(k, v)| meta.field(k).is_some_and(|have| have == v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(dept: &str, year: &str) -> ChunkMetadata {
        ChunkMetadata {
            dept: normalize_value(dept),
            year: normalize_value(year),
            semester: None,
            course_code: None,
            doc_type: DOC_TYPE_SYLLABUS.into(),
            source: "cs-2024.pdf".into(),
            chunk_text: "text".into(),
            chunk_index: 0,
            char_start: 0,
            char_end: 4,
            section: "general".into(),
            section_type: "general".into(),
            course_info: BTreeMap::new(),
        }
    }

    #[test]
    fn filter_is_case_and_space_insensitive() {
        let m = meta("CS", "2024");
        assert!(MetadataFilter::scope(" cs ", "2024").matches(&m));
        assert!(!MetadataFilter::scope("Physics", "2024").matches(&m));
    }

    #[test]
    fn optional_keys_must_exist_when_bound() {
        let m = meta("CS", "2024");
        let f = MetadataFilter::scope("cs", "2024").with_opt(keys::SEMESTER, Some("III"));
        assert!(!f.matches(&m));
        let f = MetadataFilter::scope("cs", "2024").with_opt(keys::SEMESTER, Some("  "));
        assert!(f.matches(&m));
    }

    #[test]
    fn scope_detection() {
        assert!(!MetadataFilter::new().binds_scope());
        assert!(!MetadataFilter::new().with(keys::DEPT, "cs").binds_scope());
        assert!(!MetadataFilter::scope("cs", "  ").binds_scope());
        assert!(MetadataFilter::scope("cs", "2024").binds_scope());
    }

    #[test]
    fn metadata_json_shape() {
        let v = serde_json::to_value(meta("CS", "2024")).unwrap();
        assert_eq!(v["dept"], "cs");
        assert!(v.get("semester").is_none());
        let back: ChunkMetadata = serde_json::from_value(v).unwrap();
        assert_eq!(back.section, "general");
    }
}
