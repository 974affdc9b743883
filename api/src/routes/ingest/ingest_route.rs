//! POST /ingest and DELETE /ingest.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};
use rag_store::NoopProgress;
use tracing::info;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::ingest::ingest_request::{DeleteParams, DeleteResponse, IngestBody, IngestResponse},
};

/// Handler: POST /ingest
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/ingest \
///   -H 'content-type: application/json' \
///   -d '{"pdf_url":"https://uni.example/cs-2024.pdf","dept":"CS","year":"2024"}'
/// ```
pub async fn ingest_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestBody>,
) -> AppResult<Response> {
    let req = body.into_request()?;
    let source = req.document.source_id();

    let _scope = state.ingest_locks.acquire(&req.dept, &req.year).await;
    let result = state
        .store
        .ingestion()
        .ingest(&req, &NoopProgress)
        .await?;

    Ok(ApiResponse::ok(IngestResponse::from_result(&source, result)))
}

/// Handler: DELETE /ingest?dept=CS&year=2024
pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    Query(p): Query<DeleteParams>,
) -> AppResult<Response> {
    if p.dept.trim().is_empty() || p.year.trim().is_empty() {
        return Err(AppError::BadRequest("dept and year are required".into()));
    }

    let _scope = state.ingest_locks.acquire(&p.dept, &p.year).await;
    let deleted = state.store.ingestion().delete(&p.dept, &p.year).await?;
    info!(dept = %p.dept, year = %p.year, deleted, "scope deleted");

    let body = DeleteResponse {
        message: format!("deleted {deleted} vectors for {} {}", p.dept.trim(), p.year.trim()),
        deleted,
    };
    Ok(ApiResponse::ok(body))
}
