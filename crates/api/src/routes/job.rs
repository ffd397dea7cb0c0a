//! Job control and view endpoints.
//!
//! ```text
//! /job/start                start a backend job (POST)
//! /job                      current view snapshot (GET)
//! /job/phase/{phase}        phase detail pass-through (GET)
//! /job/approvals            resolve one duplicate pair (POST)
//! ```

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use dedup_client::StartJobRequest;
use dedup_core::approval::ApprovalAction;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/job/approvals`.
#[derive(Debug, Deserialize)]
pub struct ApprovalBody {
    pub pair_id: String,
    pub action: ApprovalAction,
}

/// POST /api/v1/job/start
///
/// Start a new deduplication job on the backend and return the seeded
/// view. 409 while a start is in flight or a job is still running.
async fn start_job(
    State(state): State<AppState>,
    Json(body): Json<StartJobRequest>,
) -> AppResult<impl IntoResponse> {
    let job_id = state.sessions.start_job(body).await?;
    tracing::info!(job_id = %job_id, "Job session started");

    let view = state
        .sessions
        .current_view()
        .await
        .ok_or_else(|| AppError::InternalError("view missing after start".into()))?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/job
///
/// Current canonical view of the active (or last finished) job.
/// 404 when no job has been started in this session.
async fn current_job(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let view = state
        .sessions
        .current_view()
        .await
        .ok_or(dedup_session::SessionError::NoActiveJob)?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/job/phase/{phase}
///
/// Pass the phase-specific detail payload through from the backend.
/// The shape varies per phase, so it stays untyped.
async fn phase_details(
    State(state): State<AppState>,
    Path(phase): Path<String>,
) -> AppResult<impl IntoResponse> {
    let details = state.sessions.phase_details(&phase).await?;
    Ok(Json(DataResponse { data: details }))
}

/// POST /api/v1/job/approvals
///
/// Submit the user's decision for one pending duplicate pair. 404 for an
/// unknown pair, 409 when the job is not awaiting approval.
async fn submit_approval(
    State(state): State<AppState>,
    Json(body): Json<ApprovalBody>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .sessions
        .submit_approval(&body.pair_id, body.action)
        .await?;
    tracing::info!(pair_id = %body.pair_id, action = ?body.action, "Approval submitted");
    Ok(Json(DataResponse { data: outcome }))
}

/// Job routes, nested at `/job`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/job/start", post(start_job))
        .route("/job", get(current_job))
        .route("/job/phase/{phase}", get(phase_details))
        .route("/job/approvals", post(submit_approval))
}
