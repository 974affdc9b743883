//! POST /chat: answers a student question from the syllabus.

use std::sync::Arc;

use axum::{Json, extract::State, response::Response};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::chat::chat_request::ChatRequest,
};

/// Handler: POST /chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/chat \
///   -H 'content-type: application/json' \
///   -d '{"question":"What is the marking scheme?","dept":"CS","year":"2024"}'
/// ```
pub async fn chat_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Response> {
    let result = state.answers.answer(&body.question, &body.filter()).await?;
    Ok(ApiResponse::ok(result))
}
