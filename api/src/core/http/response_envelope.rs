use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rag_store::IngestStage;
use serde::Serialize;

/// Universal response envelope for both success and error.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Stable, machine-readable error code (e.g. "EMPTY_DOCUMENT").
    pub code: &'static str,
    /// Human-friendly error message.
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Field path like `dept`, or `stage.embedding` for ingestion failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Optional hint to help the client fix the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiErrorDetail {
    /// Detail for a JSON field the client got wrong.
    pub fn field(path: Option<String>, hint: Option<String>) -> Self {
        Self { path, hint }
    }

    /// Detail naming the ingestion stage that failed, with what the client can do about it.
    pub fn ingest_stage(stage: IngestStage) -> Self {
        let hint = match stage {
            IngestStage::Fetching => Some("Check that pdf_url is reachable and under the size limit."),
            IngestStage::Extracting => Some("The document has no extractable text; scanned PDFs need OCR first."),
            IngestStage::Embedding => Some("The embedding service is unavailable; retry later."),
            IngestStage::Upserting => {
                Some("The vector index rejected the write; the previous version is kept.")
            }
            IngestStage::Chunking | IngestStage::Done | IngestStage::Failed => None,
        };
        Self {
            path: Some(format!("stage.{stage}")),
            hint: hint.map(str::to_string),
        }
    }
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// `200 OK` with `data`.
    pub fn ok(data: T) -> Response {
        Self::success(data).into_response_with_status(StatusCode::OK)
    }

    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(
        code: &'static str,
        message: impl Into<String>,
        details: Vec<ApiErrorDetail>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
                details,
            }),
        }
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shapes() {
        let ok = serde_json::to_value(ApiResponse::success(5)).unwrap();
        assert_eq!(ok, serde_json::json!({ "success": true, "data": 5 }));

        let err = serde_json::to_value(ApiResponse::<()>::error("BAD_REQUEST", "dept missing", vec![]))
            .unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"]["code"], "BAD_REQUEST");
        assert!(err["error"].get("details").is_none());
    }

    #[test]
    fn failed_stage_detail_carries_a_hint() {
        let d = ApiErrorDetail::ingest_stage(IngestStage::Upserting);
        assert_eq!(d.path.as_deref(), Some("stage.upserting"));
        assert!(d.hint.is_some_and(|h| h.contains("previous version is kept")));

        assert!(ApiErrorDetail::ingest_stage(IngestStage::Chunking).hint.is_none());
    }
}
