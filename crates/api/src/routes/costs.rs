//! Cost telemetry endpoint.
//!
//! ```text
//! /costs/{job_id}    token/cost counters for a job (GET)
//! ```
//!
//! The upstream cost tracker is not wired up yet; the endpoint returns
//! zeroed counters so the console's cost panel renders without errors.

use axum::extract::Path;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Cost summary for one job.
#[derive(Debug, Serialize)]
pub struct JobCosts {
    pub job_id: String,
    pub total_runs: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub runs: Vec<serde_json::Value>,
}

impl JobCosts {
    fn zeroed(job_id: String) -> Self {
        Self {
            job_id,
            total_runs: 0,
            total_tokens: 0,
            total_cost: 0.0,
            runs: Vec::new(),
        }
    }
}

/// GET /api/v1/costs/{job_id}
async fn job_costs(Path(job_id): Path<String>) -> AppResult<impl IntoResponse> {
    Ok(Json(JobCosts::zeroed(job_id)))
}

/// Cost routes, nested at `/costs`.
pub fn router() -> Router<AppState> {
    Router::new().route("/costs/{job_id}", get(job_costs))
}
