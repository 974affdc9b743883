//! GET /: liveness plus index and LLM reachability.

use std::sync::Arc;

use ai_llm_service::health_service::HealthStatus;
use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;
use tracing::warn;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ServiceStatus {
    /// Healthy when everything answers, unhealthy when nothing does.
    pub fn from_checks(index_ok: bool, llm_ok: bool) -> Self {
        match (index_ok, llm_ok) {
            (true, true) => ServiceStatus::Healthy,
            (false, false) => ServiceStatus::Unhealthy,
            _ => ServiceStatus::Degraded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    pub index_backend: &'static str,
    pub index_connected: bool,
    pub llm_connected: bool,
    pub providers: Vec<HealthStatus>,
}

/// Handler: GET /
pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let (index, providers) = tokio::join!(state.store.index().health(), state.llm.health_all());

    let index_connected = match index {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "index health check failed");
            false
        }
    };
    let llm_connected = !providers.is_empty() && providers.iter().all(|p| p.ok);
    let status = ServiceStatus::from_checks(index_connected, llm_connected);

    let body = HealthResponse {
        status,
        index_backend: state.store.index().backend_name(),
        index_connected,
        llm_connected,
        providers,
    };
    let code = match status {
        ServiceStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    ApiResponse::success(body).into_response_with_status(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_checks() {
        assert_eq!(ServiceStatus::from_checks(true, true), ServiceStatus::Healthy);
        assert_eq!(ServiceStatus::from_checks(true, false), ServiceStatus::Degraded);
        assert_eq!(ServiceStatus::from_checks(false, true), ServiceStatus::Degraded);
        assert_eq!(ServiceStatus::from_checks(false, false), ServiceStatus::Unhealthy);
        assert_eq!(serde_json::to_value(ServiceStatus::Degraded).unwrap(), "degraded");
    }
}
