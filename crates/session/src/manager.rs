//! Lifecycle owner for the active deduplication job.
//!
//! A [`SessionManager`] holds at most one live session. Starting a job
//! seeds a canonical [`JobView`], spawns the poll and stream tasks, and
//! publishes a [`SessionEvent`] after every state change. Both tasks
//! funnel their updates through the manager so the merge logic in
//! `dedup_core::reconcile` stays the only writer of the view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dedup_client::{
    ApprovalOutcome, DedupApi, DedupApiError, StartJobRequest, StreamClient, StreamMessage,
};
use dedup_core::approval::{ApprovalAction, ApprovalRequest};
use dedup_core::job::{JobState, JobStatus, PartialStatus};
use dedup_core::reconcile::{JobView, SideEffect};
use dedup_core::types::JobId;
use dedup_core::CoreError;

use crate::events::SessionEvent;
use crate::listener;
use crate::poller;

/// Capacity of the broadcast channel carrying [`SessionEvent`]s.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `shutdown` waits for the background tasks to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SessionError {
    /// A `start_job` call is already in flight.
    #[error("a job start is already in progress")]
    StartInFlight,

    /// No job has been started in this session.
    #[error("no active job")]
    NoActiveJob,

    /// An approval was submitted while the job was not awaiting one.
    #[error("job is not awaiting approval")]
    NotAwaitingApproval,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("backend request failed: {0}")]
    Backend(#[from] DedupApiError),
}

/// State for one started job: the canonical view plus the handles of
/// the two background tasks feeding it.
struct JobSession {
    view: JobView,
    cancel: CancellationToken,
    // Set right after the session is registered; the tasks must find
    // the session in the map on their first tick.
    poll_handle: Option<JoinHandle<()>>,
    stream_handle: Option<JoinHandle<()>>,
}

pub struct SessionManager {
    api: Arc<DedupApi>,
    stream: Arc<StreamClient>,
    poll_interval: Duration,
    inner: RwLock<Option<JobSession>>,
    event_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
    starting: AtomicBool,
}

impl SessionManager {
    pub fn new(api: DedupApi, stream: StreamClient, poll_interval: Duration) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api: Arc::new(api),
            stream: Arc::new(stream),
            poll_interval,
            inner: RwLock::new(None),
            event_tx,
            cancel: CancellationToken::new(),
            starting: AtomicBool::new(false),
        })
    }

    /// Subscribe to view-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Poll interval used by the background snapshot task.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn api(&self) -> &Arc<DedupApi> {
        &self.api
    }

    pub(crate) fn stream_client(&self) -> &Arc<StreamClient> {
        &self.stream
    }

    /// Start a new backend job and become its session.
    ///
    /// Rejected while another start is in flight or while the current
    /// job is still running. A finished previous session is torn down
    /// and replaced.
    pub async fn start_job(
        self: &Arc<Self>,
        request: StartJobRequest,
    ) -> Result<JobId, SessionError> {
        if self
            .starting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::StartInFlight);
        }
        let result = self.start_job_inner(request).await;
        self.starting.store(false, Ordering::SeqCst);
        result
    }

    async fn start_job_inner(
        self: &Arc<Self>,
        request: StartJobRequest,
    ) -> Result<JobId, SessionError> {
        {
            let guard = self.inner.read().await;
            if let Some(session) = guard.as_ref() {
                if session.view.running {
                    return Err(SessionError::Core(CoreError::Conflict(
                        "a job is already running".into(),
                    )));
                }
            }
        }

        let started = self.api.start_job(&request).await?;
        let job_id = started.job_id;
        info!(job_id = %job_id, "backend job started");

        let cancel = self.cancel.child_token();
        let view = JobView::seed(job_id.clone());
        let snapshot = view.clone();

        // Register the session before spawning the tasks so their first
        // tick finds it in the map.
        let previous = {
            let mut guard = self.inner.write().await;
            guard.replace(JobSession {
                view,
                cancel: cancel.clone(),
                poll_handle: None,
                stream_handle: None,
            })
        };
        if let Some(old) = previous {
            old.cancel.cancel();
            if let Some(handle) = old.poll_handle {
                handle.abort();
            }
            if let Some(handle) = old.stream_handle {
                handle.abort();
            }
        }

        let poll_handle =
            tokio::spawn(poller::run(Arc::clone(self), job_id.clone(), cancel.clone()));
        let stream_handle = tokio::spawn(listener::run(Arc::clone(self), job_id.clone(), cancel));
        {
            let mut guard = self.inner.write().await;
            if let Some(session) = guard.as_mut() {
                if session.view.status.job_id == job_id {
                    session.poll_handle = Some(poll_handle);
                    session.stream_handle = Some(stream_handle);
                }
            }
        }

        let _ = self.event_tx.send(SessionEvent::JobStarted {
            job_id: job_id.clone(),
        });
        self.publish_view(snapshot);
        Ok(job_id)
    }

    /// Snapshot of the canonical view, if a job has been started.
    pub async fn current_view(&self) -> Option<JobView> {
        let guard = self.inner.read().await;
        guard.as_ref().map(|s| s.view.clone())
    }

    /// Job id of the active session, if any.
    pub async fn active_job_id(&self) -> Option<JobId> {
        let guard = self.inner.read().await;
        guard.as_ref().map(|s| s.view.status.job_id.clone())
    }

    /// Pass-through fetch of the active job's phase detail payload.
    pub async fn phase_details(
        &self,
        phase: &str,
    ) -> Result<serde_json::Value, SessionError> {
        let job_id = self.active_job_id().await.ok_or(SessionError::NoActiveJob)?;
        Ok(self.api.phase_details(&job_id, phase).await?)
    }

    /// Merge a full poll snapshot. Returns `true` once the job has
    /// reached a terminal state, so the poller knows to stop.
    pub(crate) async fn apply_snapshot(self: &Arc<Self>, job_id: &str, status: JobStatus) -> bool {
        let (effects, snapshot, finished) = {
            let mut guard = self.inner.write().await;
            let Some(session) = guard.as_mut() else {
                return true;
            };
            if session.view.status.job_id != job_id {
                debug!(job_id, "ignoring snapshot for a different job");
                return true;
            }
            let effects = session.view.apply_snapshot(status);
            let finished = session.view.status.status.is_terminal();
            (effects, session.view.clone(), finished)
        };
        self.publish_view(snapshot);
        self.run_effects(job_id, effects).await;
        finished
    }

    /// Dispatch a parsed stream message into the canonical view.
    pub(crate) async fn handle_stream_message(
        self: &Arc<Self>,
        job_id: &str,
        message: StreamMessage,
    ) {
        match message {
            StreamMessage::JobUpdate(partial) => {
                self.apply_partial(job_id, partial).await;
            }
            StreamMessage::PendingApproval => {
                let (effects, snapshot) = {
                    let mut guard = self.inner.write().await;
                    let Some(session) = guard.as_mut() else {
                        return;
                    };
                    if session.view.status.job_id != job_id {
                        return;
                    }
                    let effects = session.view.request_approval_fetch();
                    (effects, session.view.clone())
                };
                self.publish_view(snapshot);
                self.run_effects(job_id, effects).await;
            }
            StreamMessage::Completed => {
                let partial = PartialStatus {
                    status: Some(JobState::Completed),
                    ..PartialStatus::default()
                };
                self.apply_partial(job_id, partial).await;
            }
            StreamMessage::Error { message } => {
                let partial = PartialStatus {
                    status: Some(JobState::Failed),
                    error: message.or_else(|| Some("job failed".into())),
                    ..PartialStatus::default()
                };
                self.apply_partial(job_id, partial).await;
            }
            StreamMessage::Unknown { kind } => {
                debug!(job_id, kind, "ignoring unknown stream message");
            }
        }
    }

    async fn apply_partial(self: &Arc<Self>, job_id: &str, partial: PartialStatus) {
        let (effects, snapshot) = {
            let mut guard = self.inner.write().await;
            let Some(session) = guard.as_mut() else {
                return;
            };
            if session.view.status.job_id != job_id {
                debug!(job_id, "ignoring partial update for a different job");
                return;
            }
            let effects = session.view.apply_partial(partial);
            (effects, session.view.clone())
        };
        self.publish_view(snapshot);
        self.run_effects(job_id, effects).await;
    }

    async fn run_effects(self: &Arc<Self>, job_id: &str, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                // Boxed: the fetch folds its batch back through this
                // function, and the cycle must not inline its future.
                SideEffect::FetchApprovals => {
                    Box::pin(self.fetch_pending_approvals(job_id)).await
                }
                SideEffect::JobFinished => {
                    info!(job_id, "job reached a terminal state");
                    self.finish_session(job_id).await;
                    let _ = self.event_tx.send(SessionEvent::JobFinished {
                        job_id: job_id.to_owned(),
                    });
                }
            }
        }
    }

    /// Fetch the pending-approval batch and fold it into the view.
    ///
    /// Network I/O happens outside the lock. A failed fetch leaves the
    /// guard armed; the next poll snapshot remains the fallback.
    async fn fetch_pending_approvals(self: &Arc<Self>, job_id: &str) {
        let result = self.api.pending_approvals(job_id).await;
        let (effects, snapshot) = {
            let mut guard = self.inner.write().await;
            let Some(session) = guard.as_mut() else {
                return;
            };
            if session.view.status.job_id != job_id {
                return;
            }
            let effects = match result {
                Ok(batch) => session.view.apply_pending_batch(batch),
                Err(err) => {
                    warn!(job_id, error = %err, "failed to fetch pending approvals");
                    session.view.note_approvals_fetch_failed();
                    Vec::new()
                }
            };
            (effects, session.view.clone())
        };
        self.publish_view(snapshot);
        self.run_effects(job_id, effects).await;
    }

    /// Submit the user's decision for one duplicate pair.
    pub async fn submit_approval(
        self: &Arc<Self>,
        pair_id: &str,
        action: ApprovalAction,
    ) -> Result<ApprovalOutcome, SessionError> {
        let job_id = {
            let guard = self.inner.read().await;
            let session = guard.as_ref().ok_or(SessionError::NoActiveJob)?;
            if session.view.status.status != JobState::AwaitingApproval {
                return Err(SessionError::NotAwaitingApproval);
            }
            if !session
                .view
                .pending_pairs
                .iter()
                .any(|p| p.pair_id == pair_id)
            {
                return Err(SessionError::Core(CoreError::NotFound {
                    entity: "DuplicatePair",
                    id: pair_id.to_owned(),
                }));
            }
            session.view.status.job_id.clone()
        };

        let request = ApprovalRequest::new(job_id.clone(), pair_id, action);
        let outcome = match self.api.submit_approval(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let detail = err.to_string();
                let snapshot = {
                    let mut guard = self.inner.write().await;
                    match guard.as_mut() {
                        Some(session) => {
                            session.view.note_approval_failed(&detail);
                            Some(session.view.clone())
                        }
                        None => None,
                    }
                };
                if let Some(snapshot) = snapshot {
                    self.publish_view(snapshot);
                }
                return Err(err.into());
            }
        };

        let (effects, snapshot) = {
            let mut guard = self.inner.write().await;
            let session = guard.as_mut().ok_or(SessionError::NoActiveJob)?;
            let effects = session.view.resolve_pair(pair_id, action)?;
            (effects, session.view.clone())
        };
        self.publish_view(snapshot);
        self.run_effects(&job_id, effects).await;
        Ok(outcome)
    }

    /// Stop the background tasks of a finished job. The view is kept so
    /// late readers still see the final state.
    async fn finish_session(&self, job_id: &str) {
        let guard = self.inner.read().await;
        if let Some(session) = guard.as_ref() {
            if session.view.status.job_id == job_id {
                session.cancel.cancel();
            }
        }
    }

    fn publish_view(&self, view: JobView) {
        let _ = self.event_tx.send(SessionEvent::ViewChanged { view });
    }

    /// Cancel all background work and wait briefly for it to finish.
    pub async fn shutdown(&self) {
        info!("shutting down session manager");
        self.cancel.cancel();
        let session = {
            let mut guard = self.inner.write().await;
            guard.take()
        };
        if let Some(session) = session {
            session.cancel.cancel();
            let waited = tokio::time::timeout(SHUTDOWN_GRACE, async {
                if let Some(handle) = session.poll_handle {
                    let _ = handle.await;
                }
                if let Some(handle) = session.stream_handle {
                    let _ = handle.await;
                }
            })
            .await;
            if waited.is_err() {
                warn!("session tasks did not stop within the grace period");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<SessionManager> {
        SessionManager::new(
            DedupApi::new("http://127.0.0.1:1".into()),
            StreamClient::new("ws://127.0.0.1:1".into()),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn pending_approval_message_without_session_is_dropped() {
        let manager = manager();
        manager
            .handle_stream_message("job-1", StreamMessage::PendingApproval)
            .await;
        assert!(manager.current_view().await.is_none());
    }

    #[tokio::test]
    async fn snapshot_for_unknown_job_stops_the_poller() {
        let manager = manager();
        let status = JobStatus {
            job_id: "job-9".into(),
            status: JobState::Running,
            progress: dedup_core::job::JobProgress {
                phase: "phase_1_fetch".into(),
                current_step: 1,
                total_steps: dedup_core::job::TOTAL_STEPS,
                message: "Fetching contacts".into(),
            },
            metrics: Default::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            error: None,
        };
        assert!(manager.apply_snapshot("job-9", status).await);
    }
}
