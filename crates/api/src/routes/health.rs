use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether a job session is currently active.
    pub job_active: bool,
}

/// GET /health -- returns service health and whether a job is active.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let job_active = state
        .sessions
        .current_view()
        .await
        .map(|view| view.running)
        .unwrap_or(false);

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        job_active,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
