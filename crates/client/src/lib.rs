//! Typed client for the remote deduplication backend.
//!
//! Provides the REST wrapper ([`api::DedupApi`]), the WebSocket stream
//! client ([`stream::StreamClient`]), and tagged message parsing
//! ([`messages`]) for the push-update channel.

pub mod api;
pub mod messages;
pub mod stream;

pub use api::{ApprovalOutcome, DedupApi, DedupApiError, StartJobRequest, StartJobResponse};
pub use messages::{parse_message, StreamMessage};
pub use stream::{ws_url_from_api_url, StreamClient, StreamConnection, StreamError};
