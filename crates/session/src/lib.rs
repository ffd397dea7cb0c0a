//! Job session runtime for the dedup console.
//!
//! Owns the canonical [`dedup_core::reconcile::JobView`] for the active
//! job, runs the two update channels (status poller and stream
//! listener), executes the side effects the reconciler requests, and
//! broadcasts view changes to UI consumers.

pub mod events;
mod listener;
pub mod manager;
mod poller;

pub use events::SessionEvent;
pub use manager::{SessionManager, SessionError};
