use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast::error::RecvError;

use dedup_session::SessionManager;

use crate::ws::manager::WsManager;

/// Spawn a background task that forwards session events to every open
/// browser connection.
///
/// Each [`dedup_session::SessionEvent`] is serialized once and broadcast
/// as a text frame. Lagged subscribers skip ahead; the next `ViewChanged`
/// event carries the full snapshot, so nothing is lost for the client.
pub fn start_event_forwarder(
    sessions: Arc<SessionManager>,
    ws_manager: Arc<WsManager>,
) -> tokio::task::JoinHandle<()> {
    let mut events = sessions.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        ws_manager.broadcast(Message::Text(json.into())).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize session event");
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event forwarder lagged behind the session bus");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Session event bus closed, stopping forwarder");
                    break;
                }
            }
        }
    })
}
