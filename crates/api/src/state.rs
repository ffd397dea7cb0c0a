use std::sync::Arc;

use dedup_session::SessionManager;

use crate::chat::ChatClient;
use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Owner of the active job session (poller + stream listener + view).
    pub sessions: Arc<SessionManager>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Anthropic chat proxy client.
    pub chat: Arc<ChatClient>,
}
