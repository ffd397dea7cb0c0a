use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use dedup_session::{SessionEvent, SessionManager};

use crate::state::AppState;
use crate::ws::manager::WsManager;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two spawned tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, state.sessions))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Sends the current view snapshot so the client doesn't wait for
///      the next change.
///   3. Spawns a sender task that forwards messages from the manager channel.
///   4. Processes inbound messages on the current task.
///   5. Cleans up on disconnect.
async fn handle_socket(
    socket: WebSocket,
    ws_manager: Arc<WsManager>,
    sessions: Arc<SessionManager>,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Initial snapshot, if a job has been started.
    if let Some(view) = sessions.current_view().await {
        let event = SessionEvent::ViewChanged { view };
        match serde_json::to_string(&event) {
            Ok(json) => {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    ws_manager.remove(&conn_id).await;
                    return;
                }
            }
            Err(e) => {
                tracing::error!(conn_id = %conn_id, error = %e, "Failed to serialize view snapshot");
            }
        }
    }

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: the console protocol is push-only, so inbound
    // frames other than control messages are ignored.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_msg) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
