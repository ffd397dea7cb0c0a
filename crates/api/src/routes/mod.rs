pub mod chat;
pub mod costs;
pub mod health;
pub mod job;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                       WebSocket (view push stream)
///
/// /job/start                start a job (POST)
/// /job                      current view snapshot (GET)
/// /job/phase/{phase}        phase detail pass-through (GET)
/// /job/approvals            resolve one duplicate pair (POST)
///
/// /chat                     chat proxy (POST)
///
/// /costs/{job_id}           cost telemetry (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(job::router())
        .merge(chat::router())
        .merge(costs::router())
}
