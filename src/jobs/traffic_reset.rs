//! Traffic reset job.
//!
//! This job loads every client with a reset policy, decides which ones are due
//! at the run's timestamp and zeroes their `up`/`down` counters inside a single
//! transaction.

use chrono::{DateTime, FixedOffset, Local};
use tracing::{debug, info, warn, Instrument};

use crate::policy::ResetPolicy;
use crate::server::logging::{generate_run_id, log_traffic_event, TrafficEvent};
use crate::store::TrafficStore;

use super::JobError;

/// How per-client update failures affect the run's transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Skip failed clients and commit everything else.
    #[default]
    BestEffort,
    /// Roll back the whole run on the first failed update.
    AllOrNothing,
}

/// Outcome of one traffic reset run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    /// Clients with a reset policy configured
    pub candidates: usize,
    /// Clients whose counters were zeroed
    pub reset: usize,
    /// Clients whose update failed and were skipped
    pub failed: usize,
}

/// Reset traffic for all due clients, using the local wall clock as "now".
///
/// The time is read once; every client in the run is judged against it.
pub async fn run_traffic_reset<S: TrafficStore>(
    store: &S,
    mode: CommitMode,
) -> Result<ResetSummary, JobError> {
    let now = Local::now().fixed_offset();
    run_traffic_reset_at(store, &now, mode).await
}

/// Reset traffic for all clients due at `now`.
///
/// Queries for clients where:
/// - `traffic_reset_day > 0 OR last_traffic_reset > 0`
///
/// Updates due clients:
/// - Sets `up = 0`, `down = 0`
/// - Sets `last_traffic_reset = now`
///
/// A failed fetch aborts the run before any transaction is opened. A failed
/// update is logged and skipped; in [`CommitMode::BestEffort`] the transaction
/// is still committed, in [`CommitMode::AllOrNothing`] it is rolled back and
/// the run fails.
pub async fn run_traffic_reset_at<S: TrafficStore>(
    store: &S,
    now: &DateTime<FixedOffset>,
    mode: CommitMode,
) -> Result<ResetSummary, JobError> {
    let reset_at = now.timestamp();

    debug!("Checking for traffic resets at {}", now);

    let candidates = store.fetch_reset_candidates().await?;

    let mut summary = ResetSummary {
        candidates: candidates.len(),
        ..ResetSummary::default()
    };

    let mut tx = store.begin().await?;

    for client in &candidates {
        let policy = ResetPolicy::for_client(client);
        if !policy.is_due(now) {
            continue;
        }

        log_traffic_event(
            TrafficEvent::Reset,
            &client.name,
            Some(&format!(
                "policy={}, traffic={} bytes",
                policy.kind(),
                client.total_traffic()
            )),
        );

        match store.reset_client_traffic(&mut tx, client.id, reset_at).await {
            Ok(()) => summary.reset += 1,
            Err(e) => {
                summary.failed += 1;
                log_traffic_event(TrafficEvent::ResetFailed, &client.name, Some(&e.to_string()));

                if mode == CommitMode::AllOrNothing {
                    if let Err(rollback_err) = store.rollback(tx).await {
                        warn!("Rollback after failed traffic reset failed: {}", rollback_err);
                    }
                    return Err(JobError::ExecutionError(format!(
                        "traffic reset for client {} failed, run rolled back: {}",
                        client.name, e
                    )));
                }
            }
        }
    }

    store.commit(tx).await?;

    Ok(summary)
}

/// Scheduled entry point: run once and log the outcome.
///
/// Failures are logged at warn level and never propagated; the next tick
/// re-evaluates every client.
pub async fn run_traffic_reset_job<S: TrafficStore>(store: &S, mode: CommitMode) {
    let span = tracing::info_span!("traffic_reset", run_id = %generate_run_id());

    async {
        match run_traffic_reset(store, mode).await {
            Ok(summary) => {
                if summary.reset > 0 || summary.failed > 0 {
                    info!(
                        candidates = summary.candidates,
                        reset = summary.reset,
                        failed = summary.failed,
                        "Traffic reset completed"
                    );
                }
            }
            Err(e) => {
                warn!("Reset traffic failed: {}", e);
            }
        }
    }
    .instrument(span)
    .await
}
