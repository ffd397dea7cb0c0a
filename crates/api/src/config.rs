/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Base HTTP URL of the deduplication backend.
    pub backend_api_url: String,
    /// WebSocket base URL of the backend; derived from `backend_api_url`
    /// when `DEDUP_WS_URL` is unset.
    pub backend_ws_url: String,
    /// Status poll interval in milliseconds (default: `2000`).
    pub poll_interval_ms: u64,
    /// Anthropic API key for the chat proxy; chat returns 503 when unset.
    pub anthropic_api_key: Option<String>,
    /// Anthropic model used by the chat proxy.
    pub anthropic_model: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                       |
    /// |-------------------------|-------------------------------|
    /// | `HOST`                  | `0.0.0.0`                     |
    /// | `PORT`                  | `3000`                        |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                          |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                          |
    /// | `DEDUP_API_URL`         | `http://localhost:8000`       |
    /// | `DEDUP_WS_URL`          | derived from `DEDUP_API_URL`  |
    /// | `POLL_INTERVAL_MS`      | `2000`                        |
    /// | `ANTHROPIC_API_KEY`     | unset (chat disabled)         |
    /// | `ANTHROPIC_MODEL`       | `claude-sonnet-4-20250514`    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let backend_api_url =
            std::env::var("DEDUP_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());

        let backend_ws_url = std::env::var("DEDUP_WS_URL")
            .unwrap_or_else(|_| dedup_client::ws_url_from_api_url(&backend_api_url));

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok().filter(|s| !s.is_empty());

        let anthropic_model = std::env::var("ANTHROPIC_MODEL")
            .unwrap_or_else(|_| "claude-sonnet-4-20250514".into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            backend_api_url,
            backend_ws_url,
            poll_interval_ms,
            anthropic_api_key,
            anthropic_model,
        }
    }
}
