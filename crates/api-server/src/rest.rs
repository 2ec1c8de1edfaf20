//! Operational endpoints: health summary and Kubernetes probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Body of GET /health, picked up by uptime dashboards.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: String,
    pub uptime_secs: u64,
    pub active_products: usize,
    pub open_kiosk_sessions: usize,
}

/// GET /health — status plus a few store gauges.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        environment: state.config.environment.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_products: state.catalog.product_count(),
        open_kiosk_sessions: state.kiosk.open_session_count(),
    })
}

/// GET /ready — readiness probe. The stores live in process memory, so the
/// service can take traffic as soon as the listener is bound.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live — liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
