//! Background poll task: fetches the full status snapshot on a fixed
//! interval and merges it into the canonical view. Polling is the
//! authoritative channel; the push stream only fills the gaps between
//! ticks.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::manager::SessionManager;

pub(crate) async fn run(manager: Arc<SessionManager>, job_id: String, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(manager.poll_interval());
    // Missed ticks (e.g. a slow backend response) collapse into one.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    debug!(job_id, "status poller started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(job_id, "status poller cancelled");
                break;
            }
            _ = ticker.tick() => {
                match manager.api().job_status(&job_id).await {
                    Ok(status) => {
                        if manager.apply_snapshot(&job_id, status).await {
                            debug!(job_id, "job finished, stopping poller");
                            break;
                        }
                    }
                    Err(err) => {
                        // Transient failures are expected while the
                        // backend spins the job up; keep ticking.
                        warn!(job_id, error = %err, "status poll failed");
                    }
                }
            }
        }
    }
}
