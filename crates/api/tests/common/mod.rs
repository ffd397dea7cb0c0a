use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use dedup_api::chat::ChatClient;
use dedup_api::config::ServerConfig;
use dedup_api::router::build_app_router;
use dedup_api::state::AppState;
use dedup_api::ws::WsManager;
use dedup_client::{DedupApi, StreamClient};
use dedup_session::SessionManager;

/// Build a test `ServerConfig` with safe defaults.
///
/// The backend URL points at a closed local port so any accidental
/// backend call fails fast instead of hanging.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        backend_api_url: "http://127.0.0.1:1".to_string(),
        backend_ws_url: "ws://127.0.0.1:1".to_string(),
        poll_interval_ms: 2000,
        anthropic_api_key: None,
        anthropic_model: "claude-sonnet-4-20250514".to_string(),
    }
}

/// Build the full application router with all middleware layers.
///
/// Mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses.
pub fn build_test_app() -> Router {
    let config = test_config();

    let api = DedupApi::new(config.backend_api_url.clone());
    let stream = StreamClient::new(config.backend_ws_url.clone());
    let sessions = SessionManager::new(
        api,
        stream,
        Duration::from_millis(config.poll_interval_ms),
    );

    let ws_manager = Arc::new(WsManager::new());
    let chat = Arc::new(ChatClient::new(None, config.anthropic_model.clone()));

    let state = AppState {
        config: Arc::new(config.clone()),
        sessions,
        ws_manager,
        chat,
    };

    build_app_router(state, &config)
}

/// Send a GET request to the app and return the raw response.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body and return the raw response.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert that an error response carries the expected status and code.
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
    assert!(json["error"].is_string());
}
