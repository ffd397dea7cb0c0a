//! Canonical job status types, mirroring the deduplication backend's
//! `/api/dedup/status/{job_id}` payload.

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

/// Total number of workflow steps reported by the backend.
pub const TOTAL_STEPS: u32 = 7;

/// Lifecycle state of a deduplication job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    AwaitingApproval,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Whether this state is terminal (no further backend updates expected).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Progress within the current workflow phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Backend phase key, e.g. `phase_2_extract`.
    pub phase: String,
    pub current_step: u32,
    pub total_steps: u32,
    /// Human-readable progress message.
    pub message: String,
}

/// Aggregate counters reported alongside progress.
///
/// All fields are optional on the wire; the backend fills them in as
/// the corresponding phases complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_contacts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates_found: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_approvals: Option<u64>,
}

/// Full job status snapshot as returned by the status endpoint.
///
/// `job_id` never changes for the lifetime of a displayed job; a new job
/// replaces the whole view rather than mutating the id in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: JobId,
    pub status: JobState,
    pub progress: JobProgress,
    #[serde(default)]
    pub metrics: JobMetrics,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Present only when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Partial status carried by `job_update` / `status_update` stream
/// messages. Only top-level fields present in the payload overwrite the
/// canonical state (shallow merge).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialStatus {
    pub job_id: Option<JobId>,
    pub status: Option<JobState>,
    pub progress: Option<JobProgress>,
    pub metrics: Option<JobMetrics>,
    pub error: Option<String>,
    pub updated_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_roundtrips_snake_case() {
        let json = serde_json::to_string(&JobState::AwaitingApproval).unwrap();
        assert_eq!(json, r#""awaiting_approval""#);
        let back: JobState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JobState::AwaitingApproval);
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::AwaitingApproval.is_terminal());
        assert!(!JobState::Pending.is_terminal());
    }

    #[test]
    fn status_parses_without_metrics_or_error() {
        let json = r#"{
            "job_id": "job-1",
            "status": "running",
            "progress": {"phase": "phase_1_connect", "current_step": 1, "total_steps": 7, "message": "Connecting..."},
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:05Z"
        }"#;
        let status: JobStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.status, JobState::Running);
        assert_eq!(status.metrics, JobMetrics::default());
        assert!(status.error.is_none());
    }

    #[test]
    fn partial_status_fields_default_to_none() {
        let partial: PartialStatus = serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
        assert_eq!(partial.status, Some(JobState::Completed));
        assert!(partial.progress.is_none());
        assert!(partial.metrics.is_none());
        assert!(partial.error.is_none());
    }
}
