//! Retrieval-only step: embed a question and fetch scoped matches, no chat.

use std::time::Instant;

use rag_store::{EmbeddingGateway, IndexGateway, MetadataFilter, RetrievalMatch, keys};
use tracing::debug;

use crate::api_types::AnswerFilter;
use crate::error::ContextorError;

/// Filter bound to the student's `{dept, year}` and, when given, semester.
pub fn scope_filter(filter: &AnswerFilter) -> MetadataFilter {
    MetadataFilter::scope(&filter.dept, &filter.year)
        .with_opt(keys::SEMESTER, filter.semester.as_deref())
}

/// Embeds `question` once and returns up to `top_k` matches, best first.
pub async fn retrieve(
    embedder: &EmbeddingGateway,
    index: &IndexGateway,
    question: &str,
    filter: &AnswerFilter,
    top_k: usize,
) -> Result<Vec<RetrievalMatch>, ContextorError> {
    let started = Instant::now();
    let vector = embedder.embed_one(question).await?;
    let embed_ms = started.elapsed().as_millis();

    let matches = index.query(&vector, top_k, &scope_filter(filter)).await?;
    debug!(
        hits = matches.len(),
        top_k,
        embed_ms,
        latency_ms = started.elapsed().as_millis(),
        "retrieved"
    );
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semester_is_optional() {
        let mut f = AnswerFilter {
            dept: "CS".into(),
            year: "2024".into(),
            semester: None,
        };
        assert_eq!(scope_filter(&f).conditions().count(), 2);
        f.semester = Some("III".into());
        let bound: Vec<_> = scope_filter(&f).conditions().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        assert!(bound.contains(&("semester".to_string(), "iii".to_string())));
    }
}
