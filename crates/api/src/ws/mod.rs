//! WebSocket infrastructure for pushing view updates to browsers.
//!
//! Provides connection management, heartbeat monitoring, the HTTP
//! upgrade handler used by Axum routes, and the forwarder task that
//! bridges session events onto every open connection.

mod forwarder;
mod handler;
mod heartbeat;
pub mod manager;

pub use forwarder::start_event_forwarder;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
