//! Background stream task: reads push frames off the job's WebSocket
//! and feeds parsed messages into the manager.
//!
//! There is no reconnect loop. When the stream drops, the poller keeps
//! the view current; a fresh connection is made only for a new job.

use std::sync::Arc;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dedup_client::parse_message;

use crate::manager::SessionManager;

pub(crate) async fn run(manager: Arc<SessionManager>, job_id: String, cancel: CancellationToken) {
    let connection = tokio::select! {
        _ = cancel.cancelled() => return,
        result = manager.stream_client().connect(&job_id) => match result {
            Ok(connection) => connection,
            Err(err) => {
                // Degraded but functional: polling still covers all
                // state transitions, just with up to one tick of lag.
                warn!(job_id, error = %err, "update stream unavailable, relying on polling");
                return;
            }
        },
    };

    let mut ws_stream = connection.ws_stream;
    debug!(job_id, "update stream listener started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(job_id, "update stream listener cancelled");
                break;
            }
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match parse_message(&text) {
                            Ok(message) => {
                                manager.handle_stream_message(&job_id, message).await;
                            }
                            Err(err) => {
                                warn!(job_id, error = %err, raw = %text, "unparseable stream message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(job_id, "update stream closed by server");
                        break;
                    }
                    // Pings are answered by tungstenite internally.
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_))) => {}
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(err)) => {
                        warn!(job_id, error = %err, "update stream error, falling back to polling");
                        break;
                    }
                    None => {
                        debug!(job_id, "update stream ended");
                        break;
                    }
                }
            }
        }
    }
}
