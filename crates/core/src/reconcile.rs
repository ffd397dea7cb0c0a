//! Canonical job-view reconciliation.
//!
//! Two independent channels feed status for the same job: the fixed-
//! interval poller (full snapshots) and the WebSocket stream (partial
//! updates). Both funnel into a single [`JobView`], which merges them
//! idempotently and fires each user-visible side effect at most once per
//! logical transition. Side effects that need I/O come back to the
//! caller as [`SideEffect`]s; activity messages are appended internally.

use chrono::Utc;
use serde::Serialize;

use crate::activity::{ActivityLog, Sender, Severity};
use crate::approval::{ApprovalAction, DuplicatePair, PendingBatch};
use crate::error::CoreError;
use crate::job::{JobMetrics, JobProgress, JobState, JobStatus, PartialStatus, TOTAL_STEPS};
use crate::phase::PhaseTimeline;
use crate::types::JobId;

/// An I/O action requested by the reconciler.
///
/// The session layer executes these; the reconciler itself never does I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Fetch the pending-approval batch from the backend.
    FetchApprovals,
    /// The job reached a terminal state; tear down poller and listener.
    JobFinished,
}

/// The canonical in-memory state for one job.
///
/// Created by [`JobView::seed`] when a job starts and replaced wholesale
/// when a new job starts; `job_id` never changes within one view.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub status: JobStatus,
    pub phases: PhaseTimeline,
    pub pending_pairs: Vec<DuplicatePair>,
    pub activity: ActivityLog,
    /// Whether the poll/stream channels should stay open.
    pub running: bool,

    // Transition-guard bookkeeping. Not part of the rendered view.
    #[serde(skip)]
    approval_prompted: bool,
    #[serde(skip)]
    finish_announced: bool,
    #[serde(skip)]
    last_progress_message: Option<String>,
    /// True until the synthetic placeholder has been overwritten by a
    /// real update; the stale-timestamp guard is suspended while set.
    #[serde(skip)]
    synthetic: bool,
}

impl JobView {
    /// Seed the view with the synthetic "starting" placeholder (the
    /// backend has accepted the start request but not yet reported).
    pub fn seed(job_id: impl Into<JobId>) -> Self {
        let job_id = job_id.into();
        let now = Utc::now();
        let mut activity = ActivityLog::new();
        activity.push(
            Sender::Agent,
            Severity::Success,
            format!("✓ Job {job_id} started successfully!"),
        );

        Self {
            status: JobStatus {
                job_id,
                status: JobState::Running,
                progress: JobProgress {
                    phase: "starting".to_string(),
                    current_step: 0,
                    total_steps: TOTAL_STEPS,
                    message: "Initializing...".to_string(),
                },
                metrics: JobMetrics {
                    total_contacts: Some(0),
                    duplicates_found: Some(0),
                    pending_approvals: Some(0),
                },
                created_at: now,
                updated_at: now,
                error: None,
            },
            phases: PhaseTimeline::new(),
            pending_pairs: Vec::new(),
            activity,
            running: true,
            approval_prompted: false,
            finish_announced: false,
            last_progress_message: Some("Initializing...".to_string()),
            synthetic: true,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.status.job_id
    }

    /// Apply a full status snapshot from the poller. A snapshot is a
    /// full overwrite, not a field merge.
    ///
    /// Snapshots for a different job or with an `updated_at` older than
    /// the current state are ignored; the placeholder seeded at start is
    /// exempt from the staleness check.
    pub fn apply_snapshot(&mut self, snapshot: JobStatus) -> Vec<SideEffect> {
        if snapshot.job_id != self.status.job_id {
            return Vec::new();
        }
        if !self.synthetic && snapshot.updated_at < self.status.updated_at {
            return Vec::new();
        }
        self.synthetic = false;

        self.status = snapshot;
        let progress = self.status.progress.clone();
        self.phases
            .observe(&progress, self.status.status == JobState::Running);
        self.note_progress_message();
        self.transition_effects()
    }

    /// Apply a partial update from the stream (shallow merge; only
    /// top-level fields present in the payload overwrite existing ones).
    ///
    /// Re-applying a payload that changes nothing is a no-op: the state,
    /// including `updated_at`, is left untouched and no effects fire.
    pub fn apply_partial(&mut self, partial: PartialStatus) -> Vec<SideEffect> {
        if let Some(ref id) = partial.job_id {
            if *id != self.status.job_id {
                return Vec::new();
            }
        }
        if let Some(ts) = partial.updated_at {
            if !self.synthetic && ts < self.status.updated_at {
                return Vec::new();
            }
        }

        let mut next = self.status.clone();
        if let Some(status) = partial.status {
            next.status = status;
        }
        if let Some(progress) = partial.progress {
            next.progress = progress;
        }
        if let Some(metrics) = partial.metrics {
            next.metrics = metrics;
        }
        if partial.error.is_some() {
            next.error = partial.error;
        }
        // A job_update carrying an error field is a failure report even
        // when it omits the status field.
        if next.error.is_some() && !next.status.is_terminal() {
            next.status = JobState::Failed;
        }

        // Idempotent merge: a payload that changes nothing must not bump
        // `updated_at` or re-fire effects.
        next.updated_at = self.status.updated_at;
        if next == self.status {
            return Vec::new();
        }
        next.updated_at = partial.updated_at.unwrap_or_else(Utc::now);

        self.synthetic = false;
        self.status = next;
        let progress = self.status.progress.clone();
        self.phases
            .observe(&progress, self.status.status == JobState::Running);
        self.note_progress_message();
        self.transition_effects()
    }

    /// Handle a bare `pending_approval` stream message: request an
    /// approval fetch unless one was already prompted for the current
    /// approval round.
    pub fn request_approval_fetch(&mut self) -> Vec<SideEffect> {
        if self.approval_prompted {
            return Vec::new();
        }
        self.approval_prompted = true;
        self.push_approval_prompt();
        vec![SideEffect::FetchApprovals]
    }

    /// Apply the fetched pending-approval batch.
    pub fn apply_pending_batch(&mut self, batch: PendingBatch) -> Vec<SideEffect> {
        let count = batch.duplicate_pairs.len();
        self.pending_pairs = batch.duplicate_pairs;
        self.status.metrics.pending_approvals = Some(count as u64);
        // Fetching is itself the prompt; don't re-fire on the next
        // status update that repeats awaiting_approval.
        self.approval_prompted = true;
        if self.status.status != JobState::AwaitingApproval {
            self.status.status = JobState::AwaitingApproval;
            self.status.updated_at = Utc::now();
        }
        self.activity.push(
            Sender::System,
            Severity::Info,
            format!("⚠️ Found {count} duplicate pair(s) requiring your approval"),
        );
        Vec::new()
    }

    /// Record a failed approval-batch fetch. The job state is left as-is;
    /// the next poll tick remains the fallback.
    pub fn note_approvals_fetch_failed(&mut self) {
        self.activity.push(
            Sender::System,
            Severity::Error,
            "Failed to fetch pending approvals",
        );
    }

    /// Resolve one pending pair after a successful submission to the
    /// backend. When the last pair resolves, the job optimistically
    /// resumes (the backend is assumed to continue without an explicit
    /// resume call).
    pub fn resolve_pair(
        &mut self,
        pair_id: &str,
        action: ApprovalAction,
    ) -> Result<Vec<SideEffect>, CoreError> {
        let idx = self
            .pending_pairs
            .iter()
            .position(|p| p.pair_id == pair_id)
            .ok_or(CoreError::NotFound {
                entity: "DuplicatePair",
                id: pair_id.to_string(),
            })?;

        self.pending_pairs.remove(idx);
        self.status.metrics.pending_approvals = Some(self.pending_pairs.len() as u64);
        self.activity.push(
            Sender::User,
            Severity::Success,
            format!(
                "{} Duplicate pair {} {}.",
                action.marker(),
                pair_id,
                action.past_tense()
            ),
        );

        if self.pending_pairs.is_empty() && self.status.status == JobState::AwaitingApproval {
            self.activity.push(
                Sender::Agent,
                Severity::Info,
                "All approvals processed. Resuming job...",
            );
            self.status.status = JobState::Running;
            self.status.updated_at = Utc::now();
            self.running = true;
            self.approval_prompted = false;
        }

        Ok(Vec::new())
    }

    /// Record a failed approval submission; the pair stays pending and
    /// the user may retry.
    pub fn note_approval_failed(&mut self, detail: &str) {
        self.activity.push(
            Sender::System,
            Severity::Error,
            format!("Failed to submit approval: {detail}"),
        );
    }

    // ---- private helpers ----

    /// Emit the current progress message into the activity feed, once
    /// per distinct message text.
    fn note_progress_message(&mut self) {
        let message = self.status.progress.message.clone();
        if message.is_empty() || self.last_progress_message.as_deref() == Some(&message) {
            return;
        }
        self.last_progress_message = Some(message.clone());
        self.activity.push(Sender::Agent, Severity::Info, message);
    }

    fn push_approval_prompt(&mut self) {
        self.activity.push(
            Sender::Agent,
            Severity::Question,
            "⚠️ Human approval required. Please review pending duplicates below.",
        );
    }

    /// Fire transition-guarded side effects for the current status.
    ///
    /// Guards fire on genuine transitions into a status, not on updates
    /// that merely repeat it; the approval guard re-arms when the job
    /// leaves `awaiting_approval`.
    fn transition_effects(&mut self) -> Vec<SideEffect> {
        let mut effects = Vec::new();
        match self.status.status {
            JobState::AwaitingApproval => {
                if !self.approval_prompted {
                    self.approval_prompted = true;
                    self.push_approval_prompt();
                    effects.push(SideEffect::FetchApprovals);
                }
            }
            JobState::Completed => {
                if !self.finish_announced {
                    self.finish_announced = true;
                    self.running = false;
                    self.activity.push(
                        Sender::System,
                        Severity::Success,
                        "✅ Job completed successfully!",
                    );
                    effects.push(SideEffect::JobFinished);
                }
            }
            JobState::Failed => {
                if !self.finish_announced {
                    self.finish_announced = true;
                    self.running = false;
                    let detail = self.status.error.as_deref().unwrap_or("Job failed");
                    self.activity.push(
                        Sender::System,
                        Severity::Error,
                        format!("❌ Error: {detail}"),
                    );
                    effects.push(SideEffect::JobFinished);
                }
            }
            JobState::Cancelled => {
                if !self.finish_announced {
                    self.finish_announced = true;
                    self.running = false;
                    self.activity
                        .push(Sender::System, Severity::Info, "Job cancelled.");
                    effects.push(SideEffect::JobFinished);
                }
            }
            JobState::Running | JobState::Pending => {
                self.approval_prompted = false;
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalStage, ContactSummary};
    use assert_matches::assert_matches;

    fn contact(id: &str, name: &str) -> ContactSummary {
        ContactSummary {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            account: None,
        }
    }

    fn pair(pair_id: &str) -> DuplicatePair {
        DuplicatePair {
            pair_id: pair_id.to_string(),
            account_name: None,
            confidence: "high".to_string(),
            reasoning: "Same person, different casing".to_string(),
            canonical_name: "Ada Lovelace".to_string(),
            contact_1: contact("003A", "Ada Lovelace"),
            contact_2: contact("003B", "ada lovelace"),
        }
    }

    fn batch(job_id: &str, pairs: Vec<DuplicatePair>) -> PendingBatch {
        PendingBatch {
            job_id: job_id.to_string(),
            stage: ApprovalStage::DuplicateMarking,
            total_updates: pairs.len() as u32,
            duplicate_pairs: pairs,
            message: String::new(),
        }
    }

    fn snapshot(job_id: &str, state: JobState, phase: &str, message: &str) -> JobStatus {
        JobStatus {
            job_id: job_id.to_string(),
            status: state,
            progress: JobProgress {
                phase: phase.to_string(),
                current_step: 2,
                total_steps: 7,
                message: message.to_string(),
            },
            metrics: JobMetrics::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            error: None,
        }
    }

    #[test]
    fn seed_creates_running_placeholder() {
        let view = JobView::seed("job-1");
        assert_eq!(view.job_id(), "job-1");
        assert_eq!(view.status.status, JobState::Running);
        assert_eq!(view.status.progress.phase, "starting");
        assert_eq!(view.status.metrics.total_contacts, Some(0));
        assert!(view.running);
        assert!(view.phases.is_empty());
    }

    #[test]
    fn snapshot_overwrites_placeholder() {
        let mut view = JobView::seed("job-1");
        let snap = snapshot("job-1", JobState::Running, "phase_2_extract", "Extracting...");
        let effects = view.apply_snapshot(snap.clone());

        assert!(effects.is_empty());
        assert_eq!(view.status, snap);
        assert_eq!(view.phases.len(), 1);
        assert_eq!(view.phases.records()[0].phase, "phase_2_extract");
    }

    #[test]
    fn snapshot_for_other_job_is_ignored() {
        let mut view = JobView::seed("job-1");
        let effects =
            view.apply_snapshot(snapshot("job-2", JobState::Completed, "completed", "Done"));
        assert!(effects.is_empty());
        assert_eq!(view.job_id(), "job-1");
        assert_eq!(view.status.status, JobState::Running);
    }

    #[test]
    fn stale_snapshot_is_ignored() {
        let mut view = JobView::seed("job-1");
        let fresh = snapshot("job-1", JobState::Running, "phase_3_validate", "Validating");
        view.apply_snapshot(fresh.clone());

        let mut stale = snapshot("job-1", JobState::Running, "phase_1_connect", "Old news");
        stale.updated_at = fresh.updated_at - chrono::Duration::seconds(10);
        let effects = view.apply_snapshot(stale);

        assert!(effects.is_empty());
        assert_eq!(view.status.progress.phase, "phase_3_validate");
    }

    // Idempotent merge: the same job_update applied twice yields the
    // same canonical status and exactly one completion message.
    #[test]
    fn repeated_completion_partial_announces_once() {
        let mut view = JobView::seed("job-1");
        let partial = PartialStatus {
            status: Some(JobState::Completed),
            ..Default::default()
        };

        let first = view.apply_partial(partial.clone());
        assert_matches!(first.as_slice(), [SideEffect::JobFinished]);
        let status_after_first = view.status.clone();

        let second = view.apply_partial(partial);
        assert!(second.is_empty());
        assert_eq!(view.status, status_after_first);
        assert_eq!(view.activity.count_of("✅ Job completed successfully!"), 1);
        assert!(!view.running);
    }

    // Transition-guarded side effects: awaiting_approval via poll
    // then again via stream fetches approvals once, not twice.
    #[test]
    fn repeated_awaiting_approval_fetches_once() {
        let mut view = JobView::seed("job-1");

        let mut snap = snapshot("job-1", JobState::AwaitingApproval, "phase_5_mark", "Pausing");
        let poll_effects = view.apply_snapshot(snap.clone());
        assert_matches!(poll_effects.as_slice(), [SideEffect::FetchApprovals]);

        snap.updated_at = snap.updated_at + chrono::Duration::seconds(1);
        let stream_effects = view.apply_partial(PartialStatus {
            status: Some(JobState::AwaitingApproval),
            updated_at: Some(snap.updated_at),
            ..Default::default()
        });
        assert!(stream_effects.is_empty());
    }

    #[test]
    fn approval_guard_rearms_after_leaving_awaiting_approval() {
        let mut view = JobView::seed("job-1");

        let first = view.apply_partial(PartialStatus {
            status: Some(JobState::AwaitingApproval),
            ..Default::default()
        });
        assert_matches!(first.as_slice(), [SideEffect::FetchApprovals]);

        view.apply_partial(PartialStatus {
            status: Some(JobState::Running),
            ..Default::default()
        });

        // A second approval round later in the job must prompt again.
        let second = view.apply_partial(PartialStatus {
            status: Some(JobState::AwaitingApproval),
            ..Default::default()
        });
        assert_matches!(second.as_slice(), [SideEffect::FetchApprovals]);
    }

    #[test]
    fn pending_approval_message_is_guarded_too() {
        let mut view = JobView::seed("job-1");

        let first = view.request_approval_fetch();
        assert_matches!(first.as_slice(), [SideEffect::FetchApprovals]);

        // A duplicate pending_approval push must not fetch again.
        assert!(view.request_approval_fetch().is_empty());
    }

    #[test]
    fn error_field_alone_fails_the_job() {
        let mut view = JobView::seed("job-1");
        let effects = view.apply_partial(PartialStatus {
            error: Some("Salesforce session expired".to_string()),
            ..Default::default()
        });

        assert_matches!(effects.as_slice(), [SideEffect::JobFinished]);
        assert_eq!(view.status.status, JobState::Failed);
        assert_eq!(
            view.activity
                .count_of("❌ Error: Salesforce session expired"),
            1
        );
    }

    #[test]
    fn failure_without_detail_uses_default_text() {
        let mut view = JobView::seed("job-1");
        view.apply_partial(PartialStatus {
            status: Some(JobState::Failed),
            ..Default::default()
        });
        assert_eq!(view.activity.count_of("❌ Error: Job failed"), 1);
    }

    // Unknown phase keys update canonical status but never the
    // timeline.
    #[test]
    fn unknown_phase_key_is_tolerated() {
        let mut view = JobView::seed("job-1");
        let snap = snapshot("job-1", JobState::Running, "phase_99_bogus", "??");
        view.apply_snapshot(snap);

        assert_eq!(view.status.progress.phase, "phase_99_bogus");
        assert!(view.phases.is_empty());
    }

    #[test]
    fn progress_message_emitted_once_per_distinct_text() {
        let mut view = JobView::seed("job-1");
        let snap = snapshot("job-1", JobState::Running, "phase_2_extract", "Extracting...");
        view.apply_snapshot(snap.clone());

        // The stream repeats the same progress as a partial.
        view.apply_partial(PartialStatus {
            progress: Some(snap.progress.clone()),
            updated_at: Some(snap.updated_at + chrono::Duration::seconds(1)),
            ..Default::default()
        });

        assert_eq!(view.activity.count_of("Extracting..."), 1);
    }

    // Approval resolution: resolving a batch of 3 in mixed order
    // empties the set and resumes exactly once, after the last one.
    #[test]
    fn resolving_batch_resumes_once_after_last_pair() {
        let mut view = JobView::seed("job-1");
        view.apply_partial(PartialStatus {
            status: Some(JobState::AwaitingApproval),
            ..Default::default()
        });
        view.apply_pending_batch(batch("job-1", vec![pair("p1"), pair("p2"), pair("p3")]));
        assert_eq!(view.status.metrics.pending_approvals, Some(3));

        view.resolve_pair("p2", ApprovalAction::Reject).unwrap();
        assert_eq!(view.status.status, JobState::AwaitingApproval);
        view.resolve_pair("p3", ApprovalAction::Approve).unwrap();
        assert_eq!(view.status.status, JobState::AwaitingApproval);
        view.resolve_pair("p1", ApprovalAction::Approve).unwrap();

        assert!(view.pending_pairs.is_empty());
        assert_eq!(view.status.status, JobState::Running);
        assert_eq!(view.status.metrics.pending_approvals, Some(0));
        assert_eq!(
            view.activity.count_of("All approvals processed. Resuming job..."),
            1
        );
    }

    #[test]
    fn resolving_unknown_pair_is_not_found() {
        let mut view = JobView::seed("job-1");
        view.apply_pending_batch(batch("job-1", vec![pair("p1")]));

        let err = view.resolve_pair("p9", ApprovalAction::Approve).unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "DuplicatePair", .. });
        assert_eq!(view.pending_pairs.len(), 1);
    }

    #[test]
    fn failed_submission_leaves_pair_pending() {
        let mut view = JobView::seed("job-1");
        view.apply_pending_batch(batch("job-1", vec![pair("p1")]));
        view.note_approval_failed("backend returned 502");

        assert_eq!(view.pending_pairs.len(), 1);
        assert_eq!(
            view.activity
                .count_of("Failed to submit approval: backend returned 502"),
            1
        );
    }

    // The full end-to-end scenario.
    #[test]
    fn end_to_end_scenario() {
        let mut view = JobView::seed("job-1");

        // Poll snapshot: running in phase_2_extract.
        let snap = snapshot("job-1", JobState::Running, "phase_2_extract", "Extracting...");
        let effects = view.apply_snapshot(snap.clone());
        assert!(effects.is_empty());
        let records = view.phases.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phase, "phase_2_extract");
        assert_eq!(records[0].step, 2);
        assert_eq!(records[0].message, "Extracting...");

        // Stream: job_update flips to awaiting_approval.
        let effects = view.apply_partial(PartialStatus {
            status: Some(JobState::AwaitingApproval),
            updated_at: Some(snap.updated_at + chrono::Duration::seconds(1)),
            ..Default::default()
        });
        assert_matches!(effects.as_slice(), [SideEffect::FetchApprovals]);
        assert_eq!(view.status.status, JobState::AwaitingApproval);

        // Fetch lands a single pair; approving it resumes the job.
        view.apply_pending_batch(batch("job-1", vec![pair("p1")]));
        view.resolve_pair("p1", ApprovalAction::Approve).unwrap();

        assert!(view.pending_pairs.is_empty());
        assert!(view.running);
        assert_eq!(view.status.status, JobState::Running);
    }

    #[test]
    fn terminal_snapshot_announces_and_finishes() {
        let mut view = JobView::seed("job-1");
        let snap = snapshot("job-1", JobState::Completed, "completed", "All done");
        let effects = view.apply_snapshot(snap);

        assert_matches!(effects.as_slice(), [SideEffect::JobFinished]);
        assert!(!view.running);
        // The `completed` pseudo-phase lands in the timeline.
        assert_eq!(view.phases.records()[0].phase, "completed");
    }
}
