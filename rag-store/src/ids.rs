//! Deterministic point identifiers.

use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id.
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

/// Id of chunk `chunk_index` of `source` under `{dept, year}`.
///
/// Inputs are expected already normalized; the same chunk of the same document
/// always maps to the same point, which makes upserts idempotent.
pub fn vector_id(dept: &str, year: &str, source: &str, chunk_index: usize) -> String {
    stable_uuid(&format!("{dept}|{year}|{source}|{chunk_index}")).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_distinct() {
        let a = vector_id("cs", "2024", "syllabus.pdf", 0);
        assert_eq!(a, vector_id("cs", "2024", "syllabus.pdf", 0));
        assert_ne!(a, vector_id("cs", "2024", "syllabus.pdf", 1));
        assert_ne!(a, vector_id("cs", "2025", "syllabus.pdf", 0));
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
