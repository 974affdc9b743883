//! Filter conversion to Qdrant `Filter`.
//!
//! Every condition is an exact keyword match; all of them must hold.

use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::{Condition, FieldCondition, Filter, Match, condition::ConditionOneOf};
use tracing::debug;

use crate::record::MetadataFilter;

/// Converts [`MetadataFilter`] to a Qdrant [`Filter`] with `must` conditions.
///
/// Returns `None` for an empty filter.
pub fn to_qdrant_filter(f: &MetadataFilter) -> Option<Filter> {
    let must: Vec<Condition> = f
        .conditions()
        .map(|(field, value)| Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: field.to_string(),
                r#match: Some(Match {
                    match_value: Some(MatchValue::Keyword(value.to_string())),
                }),
                ..Default::default()
            })),
        })
        .collect();

    debug!(conditions = must.len(), "filters::to_qdrant_filter");
    if must.is_empty() {
        return None;
    }
    Some(Filter {
        must,
        ..Default::default()
    })
}
