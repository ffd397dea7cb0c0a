//! WebSocket client for the backend's push-update stream.
//!
//! [`StreamClient`] holds the connection configuration; call
//! [`StreamClient::connect`] to open a live [`StreamConnection`] for one
//! job. The console opens exactly one connection per active `job_id`;
//! there is no automatic reconnection; when the stream drops, polling
//! remains the fallback source of truth, and a fresh connection is made
//! only when the active job changes.

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Configuration handle for the push-update stream.
pub struct StreamClient {
    ws_url: String,
}

/// A live WebSocket connection for one job's updates.
pub struct StreamConnection {
    /// The job this connection is subscribed to.
    pub job_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

/// Errors from the stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Neither the primary nor the legacy endpoint accepted the connection.
    #[error("Connection error: {0}")]
    Connection(String),
}

impl StreamClient {
    /// Create a new client.
    ///
    /// * `ws_url` - WebSocket base URL, e.g. `wss://dedup.example.com`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    /// WebSocket base URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect to the update stream for `job_id`.
    ///
    /// Tries `/ws/updates/{job_id}` first and falls back to the legacy
    /// `/ws/{job_id}` path when the primary endpoint refuses.
    pub async fn connect(&self, job_id: &str) -> Result<StreamConnection, StreamError> {
        let primary = format!("{}/ws/updates/{}", self.ws_url, job_id);

        match connect_async(&primary).await {
            Ok((ws_stream, _response)) => {
                tracing::info!(job_id, url = %primary, "Connected to update stream");
                return Ok(StreamConnection {
                    job_id: job_id.to_string(),
                    ws_stream,
                });
            }
            Err(e) => {
                tracing::debug!(job_id, error = %e, "Primary stream endpoint refused, trying legacy path");
            }
        }

        let legacy = format!("{}/ws/{}", self.ws_url, job_id);
        let (ws_stream, _response) = connect_async(&legacy).await.map_err(|e| {
            StreamError::Connection(format!(
                "Failed to connect to update stream at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(job_id, url = %legacy, "Connected to update stream (legacy path)");

        Ok(StreamConnection {
            job_id: job_id.to_string(),
            ws_stream,
        })
    }
}

/// Derive the WebSocket base URL from an HTTP base URL.
///
/// Mirrors the backend's convention: `https` becomes `wss`, `http`
/// becomes `ws`; anything else is passed through unchanged.
pub fn ws_url_from_api_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_maps_to_wss() {
        assert_eq!(
            ws_url_from_api_url("https://dedup.example.com"),
            "wss://dedup.example.com"
        );
    }

    #[test]
    fn http_maps_to_ws() {
        assert_eq!(
            ws_url_from_api_url("http://localhost:8000"),
            "ws://localhost:8000"
        );
    }

    #[test]
    fn other_schemes_pass_through() {
        assert_eq!(ws_url_from_api_url("wss://already"), "wss://already");
    }
}
