//! Workflow phase lookup table and the derived phase timeline.
//!
//! The backend reports progress as a flat `{phase, message}` pair; the
//! console reconstructs an ordered history of [`PhaseRecord`]s from the
//! sequence of progress updates it observes. The table below maps each
//! backend phase key to its display step and title.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::job::JobProgress;
use crate::types::Timestamp;

/// Static display data for a recognized phase key.
#[derive(Debug, Clone, Copy)]
pub struct PhaseInfo {
    pub step: u32,
    pub title: &'static str,
    /// Whether the backend exposes a per-phase detail payload
    /// (`GET /api/dedup/{job_id}/phase/{phase}`).
    pub has_details: bool,
}

/// The seven canonical workflow phases plus the `awaiting_approval` and
/// `completed` pseudo-phases, in backend step order.
pub const PHASE_TABLE: &[(&str, PhaseInfo)] = &[
    ("phase_1_connect", PhaseInfo { step: 1, title: "Connect to Salesforce", has_details: false }),
    ("phase_2_extract", PhaseInfo { step: 2, title: "Extract Contacts", has_details: true }),
    ("phase_3_validate", PhaseInfo { step: 3, title: "Validate Email Addresses", has_details: true }),
    ("phase_4_detect", PhaseInfo { step: 4, title: "Analyze for Duplicates", has_details: true }),
    ("phase_5_mark", PhaseInfo { step: 5, title: "Prepare Duplicate Marking", has_details: false }),
    ("awaiting_approval", PhaseInfo { step: 5, title: "Human Approval Required", has_details: false }),
    ("phase_6_update", PhaseInfo { step: 6, title: "Update Salesforce", has_details: false }),
    ("phase_7_reports", PhaseInfo { step: 7, title: "Generate Reports", has_details: false }),
    ("completed", PhaseInfo { step: 7, title: "Job Complete", has_details: false }),
];

/// Look up display data for a backend phase key.
///
/// Returns `None` for unrecognized keys; callers must ignore those for
/// timeline purposes while still applying the update to the canonical
/// job status.
pub fn phase_info(phase: &str) -> Option<PhaseInfo> {
    PHASE_TABLE
        .iter()
        .find(|(key, _)| *key == phase)
        .map(|(_, info)| *info)
}

/// Display status of a single phase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One entry in the derived phase history.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    /// Backend phase key.
    pub phase: String,
    pub step: u32,
    pub title: String,
    pub status: PhaseStatus,
    pub message: String,
    /// When this phase was first observed.
    pub timestamp: Timestamp,
    pub has_details: bool,
}

/// Ordered phase history, keyed by phase key in first-seen order.
///
/// Records are only ever appended or updated in place; the history is
/// monotonic even if the backend replays an earlier phase key.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct PhaseTimeline {
    records: Vec<PhaseRecord>,
}

impl PhaseTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one progress update into the timeline.
    ///
    /// Unknown phase keys are ignored. An existing record gets its
    /// message refreshed and its status set from the job's overall
    /// running flag; a new key is appended as `running`. Records are
    /// never reordered or removed.
    pub fn observe(&mut self, progress: &JobProgress, job_running: bool) {
        let Some(info) = phase_info(&progress.phase) else {
            return;
        };

        if let Some(record) = self.records.iter_mut().find(|r| r.phase == progress.phase) {
            record.message = progress.message.clone();
            record.status = if job_running {
                PhaseStatus::Running
            } else {
                PhaseStatus::Completed
            };
        } else {
            self.records.push(PhaseRecord {
                phase: progress.phase.clone(),
                step: info.step,
                title: info.title.to_string(),
                status: PhaseStatus::Running,
                message: progress.message.clone(),
                timestamp: Utc::now(),
                has_details: info.has_details,
            });
        }
    }

    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(phase: &str, message: &str) -> JobProgress {
        JobProgress {
            phase: phase.to_string(),
            current_step: 0,
            total_steps: 7,
            message: message.to_string(),
        }
    }

    #[test]
    fn lookup_known_phase() {
        let info = phase_info("phase_4_detect").unwrap();
        assert_eq!(info.step, 4);
        assert_eq!(info.title, "Analyze for Duplicates");
        assert!(info.has_details);
    }

    #[test]
    fn lookup_unknown_phase_returns_none() {
        assert!(phase_info("phase_99_bogus").is_none());
        assert!(phase_info("").is_none());
    }

    #[test]
    fn approval_pseudo_phase_shares_step_five() {
        let mark = phase_info("phase_5_mark").unwrap();
        let approval = phase_info("awaiting_approval").unwrap();
        assert_eq!(mark.step, approval.step);
    }

    #[test]
    fn observe_appends_in_encounter_order() {
        let mut timeline = PhaseTimeline::new();
        timeline.observe(&progress("phase_1_connect", "Connecting..."), true);
        timeline.observe(&progress("phase_2_extract", "Extracting..."), true);

        let records = timeline.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, "phase_1_connect");
        assert_eq!(records[1].phase, "phase_2_extract");
        assert_eq!(records[1].status, PhaseStatus::Running);
    }

    #[test]
    fn replayed_phase_updates_in_place() {
        // A backend regression that replays phase_1 after phase_2 must not
        // duplicate the record or disturb first-seen order.
        let mut timeline = PhaseTimeline::new();
        timeline.observe(&progress("phase_1_connect", "Connecting..."), true);
        timeline.observe(&progress("phase_2_extract", "Extracting..."), true);
        timeline.observe(&progress("phase_1_connect", "Reconnected"), true);

        let records = timeline.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, "phase_1_connect");
        assert_eq!(records[0].message, "Reconnected");
        assert_eq!(records[1].phase, "phase_2_extract");
    }

    #[test]
    fn observe_marks_completed_when_job_not_running() {
        let mut timeline = PhaseTimeline::new();
        timeline.observe(&progress("phase_7_reports", "Writing reports"), true);
        timeline.observe(&progress("phase_7_reports", "Done"), false);

        assert_eq!(timeline.records()[0].status, PhaseStatus::Completed);
    }

    #[test]
    fn unknown_phase_is_ignored() {
        let mut timeline = PhaseTimeline::new();
        timeline.observe(&progress("phase_99_bogus", "???"), true);
        assert!(timeline.is_empty());
    }
}
