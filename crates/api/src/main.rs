use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dedup_api::chat::ChatClient;
use dedup_api::config::ServerConfig;
use dedup_api::router::build_app_router;
use dedup_api::state::AppState;
use dedup_api::ws;
use dedup_client::{DedupApi, StreamClient};
use dedup_session::SessionManager;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dedup_api=debug,dedup_session=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, backend = %config.backend_api_url, "Loaded server configuration");

    // --- Backend clients + session manager ---
    let api = DedupApi::new(config.backend_api_url.clone());
    let stream = StreamClient::new(config.backend_ws_url.clone());
    let sessions = SessionManager::new(
        api,
        stream,
        Duration::from_millis(config.poll_interval_ms),
    );
    tracing::info!(poll_interval_ms = config.poll_interval_ms, "Session manager created");

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Event forwarder (session bus -> browser connections) ---
    let forwarder_handle =
        ws::start_event_forwarder(Arc::clone(&sessions), Arc::clone(&ws_manager));
    tracing::info!("Event forwarder started");

    // --- Chat proxy ---
    let chat = Arc::new(ChatClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_model.clone(),
    ));
    if !chat.is_configured() {
        tracing::warn!("ANTHROPIC_API_KEY not set, chat endpoint will return 503");
    }

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        sessions: Arc::clone(&sessions),
        ws_manager: Arc::clone(&ws_manager),
        chat,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the session first (it may have in-flight backend requests).
    sessions.shutdown().await;
    tracing::info!("Session manager shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    forwarder_handle.abort();
    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
