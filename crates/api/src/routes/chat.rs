//! Chat proxy endpoint.
//!
//! ```text
//! /chat    forward conversation to Anthropic (POST)
//! ```

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatError, ChatMessage};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /api/v1/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub messages: Vec<ChatMessage>,
}

/// Response of `POST /api/v1/chat`; kept flat to match what the console
/// front end expects.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub message: String,
}

/// POST /api/v1/chat
///
/// Forward the conversation to the Anthropic messages API and return
/// the assistant's reply. 503 when no API key is configured.
async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> AppResult<impl IntoResponse> {
    if body.messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".into()));
    }

    let message = state.chat.complete(&body.messages).await.map_err(|e| match e {
        ChatError::NotConfigured => {
            AppError::Unavailable("chat requires ANTHROPIC_API_KEY".into())
        }
        other => {
            tracing::error!(error = %other, "Chat proxy request failed");
            AppError::InternalError("Failed to get response from AI".into())
        }
    })?;

    Ok(Json(ChatReply { message }))
}

/// Chat routes, nested at `/chat`.
pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}
