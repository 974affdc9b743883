use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use rag_store::{IngestFailure, RagError};
use thiserror::Error;
use tracing::error;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("invalid configuration: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Error mapped from lower layers with a specific status and stable code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
        details: Vec<ApiErrorDetail>,
    },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR, // startup-only
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Http { status, .. } => *status,
            AppError::Bind(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Http { code, .. } => code,
        }
    }

    fn mapped(code: &'static str, message: String, details: Vec<ApiErrorDetail>) -> Self {
        AppError::Http {
            status: status_for_code(code),
            code,
            message,
            details,
        }
    }
}

/// HTTP status for a stable error code of the core crates.
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "INVALID_QUESTION" | "BAD_REQUEST" => StatusCode::BAD_REQUEST,
        "EMPTY_DOCUMENT" | "EXTRACTION_FAILED" => StatusCode::UNPROCESSABLE_ENTITY,
        "EMBEDDING_SERVICE_ERROR"
        | "INDEX_SERVICE_ERROR"
        | "ANSWER_GENERATION_ERROR"
        | "PARTIAL_WRITE" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        }
        let code = self.error_code();
        let message = self.to_string();
        let details = match self {
            AppError::Http { details, .. } => details,
            _ => Vec::new(),
        };
        ApiResponse::<()>::error(code, message, details).into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        AppError::mapped(err.code(), err.to_string(), Vec::new())
    }
}

impl From<ContextorError> for AppError {
    fn from(err: ContextorError) -> Self {
        AppError::mapped(err.code(), err.to_string(), Vec::new())
    }
}

/// Keeps the failed stage as an error detail.
impl From<IngestFailure> for AppError {
    fn from(failure: IngestFailure) -> Self {
        let detail = ApiErrorDetail::ingest_stage(failure.stage);
        AppError::mapped(failure.error.code(), failure.to_string(), vec![detail])
    }
}

#[cfg(test)]
mod tests {
    use rag_store::IngestStage;

    use super::*;

    #[test]
    fn core_errors_map_to_documented_statuses() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (
                ContextorError::InvalidQuestion { len: 0, min: 3, max: 500 }.into(),
                StatusCode::BAD_REQUEST,
                "INVALID_QUESTION",
            ),
            (
                RagError::InvalidInput("dept".into()).into(),
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
            ),
            (
                RagError::EmptyDocument { source_id: "a.pdf".into() }.into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_DOCUMENT",
            ),
            (
                RagError::Extraction("bad pdf".into()).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
            ),
            (
                RagError::EmbeddingService("down".into()).into(),
                StatusCode::BAD_GATEWAY,
                "EMBEDDING_SERVICE_ERROR",
            ),
            (
                RagError::IndexService("down".into()).into(),
                StatusCode::BAD_GATEWAY,
                "INDEX_SERVICE_ERROR",
            ),
            (
                ContextorError::AnswerGeneration("401".into()).into(),
                StatusCode::BAD_GATEWAY,
                "ANSWER_GENERATION_ERROR",
            ),
            (
                RagError::PartialWrite { expected: 3, written: 2 }.into(),
                StatusCode::BAD_GATEWAY,
                "PARTIAL_WRITE",
            ),
            (
                RagError::VectorSizeMismatch { got: 3, want: 4 }.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "VECTOR_SIZE_MISMATCH",
            ),
            (
                RagError::InvalidConfiguration("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status, "{code}");
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn ingest_failure_keeps_stage() {
        let err: AppError = IngestFailure {
            stage: IngestStage::Extracting,
            error: RagError::EmptyDocument { source_id: "a.pdf".into() },
        }
        .into();
        match err {
            AppError::Http { code, details, .. } => {
                assert_eq!(code, "EMPTY_DOCUMENT");
                assert_eq!(details[0].path.as_deref(), Some("stage.extracting"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
