//! Push-update message types and parser.
//!
//! The backend sends JSON messages over WebSocket shaped as
//! `{"type": "<kind>", "data": {...}}`; older backend builds put the
//! body under `"payload"` instead of `"data"`, so both keys are
//! accepted. Unknown tags parse into [`StreamMessage::Unknown`] rather
//! than failing: the poller remains the source of truth, and the
//! dispatcher just logs and moves on.

use serde::Deserialize;

use dedup_core::job::PartialStatus;

/// Raw WebSocket envelope before tag dispatch.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

impl Envelope {
    /// The message body, wherever the backend put it.
    fn body(self) -> serde_json::Value {
        self.data
            .or(self.payload)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// A parsed push-update message.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    /// Partial status merge (`job_update`, or the legacy `status_update`).
    JobUpdate(PartialStatus),

    /// The backend paused for human approval; fetch the pending batch.
    PendingApproval,

    /// The job completed successfully.
    Completed,

    /// The job failed. The message text may be absent.
    Error { message: Option<String> },

    /// Unrecognized tag; logged by the dispatcher and otherwise ignored.
    Unknown { kind: String },
}

/// Body of an `error` message.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Parse a WebSocket text frame into a [`StreamMessage`].
///
/// Returns `Err` only for malformed JSON or a missing `type` field; an
/// unknown tag is a successful parse (see [`StreamMessage::Unknown`]).
pub fn parse_message(text: &str) -> Result<StreamMessage, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let kind = envelope.kind.clone();
    let body = envelope.body();

    let message = match kind.as_str() {
        "job_update" | "status_update" => {
            let partial: PartialStatus = serde_json::from_value(body)?;
            StreamMessage::JobUpdate(partial)
        }
        "pending_approval" => StreamMessage::PendingApproval,
        "completed" => StreamMessage::Completed,
        "error" => {
            let error: ErrorBody = serde_json::from_value(body).unwrap_or(ErrorBody { message: None });
            StreamMessage::Error {
                message: error.message,
            }
        }
        _ => StreamMessage::Unknown { kind },
    };

    Ok(message)
}
