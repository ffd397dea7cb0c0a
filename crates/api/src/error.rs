use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use dedup_client::DedupApiError;
use dedup_core::CoreError;
use dedup_session::SessionError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`SessionError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `dedup_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A session-lifecycle error from `dedup_session`.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The deduplication backend rejected or failed a request.
    #[error(transparent)]
    Backend(#[from] DedupApiError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A required external service is not configured.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Session(session) => match session {
                SessionError::StartInFlight => (
                    StatusCode::CONFLICT,
                    "START_IN_FLIGHT",
                    "A job start is already in progress".to_string(),
                ),
                SessionError::NoActiveJob => (
                    StatusCode::NOT_FOUND,
                    "NO_ACTIVE_JOB",
                    "No active job".to_string(),
                ),
                SessionError::NotAwaitingApproval => (
                    StatusCode::CONFLICT,
                    "NOT_AWAITING_APPROVAL",
                    "Job is not awaiting approval".to_string(),
                ),
                SessionError::Core(core) => classify_core_error(core),
                SessionError::Backend(err) => classify_backend_error(err),
            },

            AppError::Backend(err) => classify_backend_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Classify a backend client error.
///
/// Backend 404s pass through as 404; any other backend response or a
/// transport failure surfaces as 502 with a sanitized message.
fn classify_backend_error(err: &DedupApiError) -> (StatusCode, &'static str, String) {
    match err {
        DedupApiError::Api { status: 404, .. } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found on the deduplication backend".to_string(),
        ),
        DedupApiError::Api { status, body } => {
            tracing::error!(status, body = %body, "Backend API error");
            (
                StatusCode::BAD_GATEWAY,
                "BACKEND_ERROR",
                format!("Deduplication backend returned status {status}"),
            )
        }
        DedupApiError::Request(e) => {
            tracing::error!(error = %e, "Backend request failed");
            (
                StatusCode::BAD_GATEWAY,
                "BACKEND_UNREACHABLE",
                "Failed to reach the deduplication backend".to_string(),
            )
        }
    }
}
