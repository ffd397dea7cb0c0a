//! View-change events broadcast to UI consumers.

use serde::Serialize;

use dedup_core::reconcile::JobView;
use dedup_core::types::JobId;

/// An event published after the canonical state changes.
///
/// Carried on a `tokio::sync::broadcast` channel; slow subscribers that
/// lag simply miss intermediate revisions and catch up with the next
/// snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new job was started and the view was seeded.
    JobStarted { job_id: JobId },

    /// The canonical view changed; the full snapshot is attached.
    ViewChanged { view: JobView },

    /// The active job reached a terminal state.
    JobFinished { job_id: JobId },
}
