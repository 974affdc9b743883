//! HTTP surface of the syllabus backend.

mod core;
mod error_handler;
mod middleware_layer;
mod routes;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use rag_store::env_string;
use tokio::signal;
use tracing::{info, warn};

pub use crate::core::app_state::{AppState, ScopeGuard, ScopeLocks};
pub use crate::core::http::response_envelope::{ApiError, ApiErrorDetail, ApiResponse};
pub use crate::error_handler::{AppError, AppResult, status_for_code};

use crate::middleware_layer::json_extractor::json_error_mapper;
use crate::routes::{
    chat::chat_route::chat_route,
    health::health_route::health_route,
    ingest::ingest_route::{delete_route, ingest_route},
};

/// All routes over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_route))
        .route("/ingest", post(ingest_route).delete(delete_route))
        .route("/chat", post(chat_route))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

/// Boots every service from the environment and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = env_string("API_ADDRESS", "0.0.0.0:8000");
    let state = Arc::new(AppState::from_env().await?);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
