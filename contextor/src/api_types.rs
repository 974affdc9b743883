//! Public API types re-used by external crates (e.g., the HTTP API layer).

use rag_store::RetrievalMatch;
use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;

/// Scope of a student's question.
///
/// # Example
/// ```
/// use contextor::AnswerFilter;
/// let f = AnswerFilter { dept: "CS".into(), year: "2024".into(), semester: None };
/// assert_eq!(f.dept, "CS");
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnswerFilter {
    pub dept: String,
    pub year: String,
    #[serde(default)]
    pub semester: Option<String>,
}

/// A chunk that was fed to the model, as shown to the student.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Rounded to three decimals.
    pub score: f32,
    pub dept: String,
    pub year: String,
    pub section: String,
    pub chunk_index: usize,
    pub source: String,
}

impl From<&RetrievalMatch> for SourceRef {
    fn from(m: &RetrievalMatch) -> Self {
        Self {
            score: (m.score * 1000.0).round() / 1000.0,
            dept: m.metadata.dept.clone(),
            year: m.metadata.year.clone(),
            section: m.metadata.section.clone(),
            chunk_index: m.metadata.chunk_index,
            source: m.metadata.source.clone(),
        }
    }
}

/// Final answer with the sources it was grounded on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub confidence: Confidence,
}
