use rag_store::{DocumentRef, IngestRequest, IngestionResult};
use serde::{Deserialize, Serialize};

use crate::error_handler::AppError;

/// Body of `POST /ingest`. Exactly one of `pdf_url` or `text` is set.
///
/// Local files are only ingested through the CLI; unknown fields such as
/// `path` are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestBody {
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Name for inline text; ignored for URLs.
    #[serde(default)]
    pub source: Option<String>,
    pub dept: String,
    pub year: String,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
}

impl IngestBody {
    pub fn into_request(self) -> Result<IngestRequest, AppError> {
        let given = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let document = match (given(self.pdf_url), self.text) {
            (Some(url), None) => DocumentRef::Url(url.trim().to_string()),
            (None, Some(body)) => DocumentRef::Text {
                name: given(self.source).unwrap_or_else(|| "inline-text".to_string()),
                body,
            },
            _ => {
                return Err(AppError::BadRequest(
                    "exactly one of pdf_url or text is required".into(),
                ));
            }
        };
        Ok(IngestRequest {
            document,
            dept: self.dept,
            year: self.year,
            course_code: self.course_code,
            semester: self.semester,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub chunks_processed: usize,
    pub vectors_stored: usize,
}

impl IngestResponse {
    pub fn from_result(source: &str, r: IngestionResult) -> Self {
        Self {
            success: true,
            message: format!("ingested {source}"),
            chunks_processed: r.chunks_processed,
            vectors_stored: r.vectors_stored,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub dept: String,
    pub year: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> IngestBody {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn exactly_one_document_source() {
        let ok = body(serde_json::json!({
            "pdf_url": "https://uni.example/cs.pdf", "dept": "CS", "year": "2024"
        }))
        .into_request()
        .unwrap();
        assert!(matches!(ok.document, DocumentRef::Url(ref u) if u == "https://uni.example/cs.pdf"));

        let none = body(serde_json::json!({ "dept": "CS", "year": "2024" })).into_request();
        assert!(matches!(none, Err(AppError::BadRequest(_))));

        let two = body(serde_json::json!({
            "pdf_url": "https://uni.example/cs.pdf", "text": "Unit 1",
            "dept": "CS", "year": "2024"
        }))
        .into_request();
        assert!(two.is_err());
    }

    #[test]
    fn local_paths_are_not_accepted_over_http() {
        let res = serde_json::from_value::<IngestBody>(serde_json::json!({
            "path": "/etc/passwd", "dept": "CS", "year": "2024"
        }));
        let err = res.unwrap_err().to_string();
        assert!(err.contains("unknown field `path`"), "{err}");
    }

    #[test]
    fn inline_text_gets_a_name() {
        let req = body(serde_json::json!({ "text": "Unit 1", "dept": "CS", "year": "2024" }))
            .into_request()
            .unwrap();
        assert_eq!(req.document.source_id(), "inline-text");
    }
}
