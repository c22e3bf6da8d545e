//! Cronjob module for scheduled reply cycles.
//!
//! Each tick runs one reply cycle followed by an engagement snapshot. Cycles
//! never overlap: a tick that finds the previous cycle still running is skipped.

use crate::config::BoxError;
use crate::engagement::track_engagement;
use crate::orchestrator::{CycleReport, MetricsClient, Orchestrator};
use crate::store::DataFiles;
use chrono::Utc;
use log::{error, info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};

/// How many recent replies each engagement snapshot covers.
pub const ENGAGEMENT_SNAPSHOT_SIZE: usize = 100;

/// Runs one cycle plus an engagement snapshot, unless a cycle is already running.
///
/// # Returns
///
/// - `Some(CycleReport)`: The report of the cycle that ran
/// - `None`: If another cycle held the orchestrator and this run was skipped
pub async fn run_scheduled_cycle(
    orchestrator: &Mutex<Orchestrator>,
    metrics: &dyn MetricsClient,
    files: &DataFiles,
) -> Option<CycleReport> {
    let report = {
        let mut guard = match orchestrator.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Previous reply cycle still running, skipping this run");
                return None;
            }
        };
        guard.run_cycle().await
    };

    match track_engagement(metrics, files, Utc::now(), ENGAGEMENT_SNAPSHOT_SIZE).await {
        Ok(count) => info!("Engagement snapshot stored for {} replies", count),
        Err(e) => error!("Engagement tracking failed: {}", e),
    }

    Some(report)
}

/// Runs one cycle to completion, asking it to stop early once `stop_signal` resolves.
///
/// When the signal fires, `true` goes out on `shutdown` and the cycle is still
/// awaited, so the candidate being posted finishes and is recorded before this
/// returns. Used by the one-shot mode with `tokio::signal::ctrl_c()`.
pub async fn run_single_cycle<S>(
    orchestrator: &Mutex<Orchestrator>,
    metrics: &dyn MetricsClient,
    files: &DataFiles,
    shutdown: &watch::Sender<bool>,
    stop_signal: S,
) -> Option<CycleReport>
where
    S: Future,
{
    let cycle = run_scheduled_cycle(orchestrator, metrics, files);
    tokio::pin!(cycle);

    tokio::select! {
        report = &mut cycle => report,
        _ = stop_signal => {
            info!("Received shutdown signal, finishing the current candidate");
            let _ = shutdown.send(true);
            cycle.await
        }
    }
}

/// Creates the scheduler that runs reply cycles on `schedule`.
///
/// # Parameters
///
/// - `orchestrator`: Shared orchestrator; held for the duration of a cycle
/// - `metrics`: Metrics source for the engagement snapshot
/// - `files`: Data directory layout
/// - `schedule`: Cron expression with a seconds field, e.g. `"0 0 */4 * * *"`
///
/// # Returns
///
/// - `Ok(JobScheduler)`: The configured, not yet started, job scheduler
/// - `Err(BoxError)`: If the cron expression is invalid or the job cannot be added
pub async fn start_reply_cronjob(
    orchestrator: Arc<Mutex<Orchestrator>>,
    metrics: Arc<dyn MetricsClient>,
    files: DataFiles,
    schedule: &str,
) -> Result<JobScheduler, BoxError> {
    let sched = JobScheduler::new().await?;

    sched
        .add(Job::new_async(schedule, move |_uuid, _l| {
            let orchestrator = orchestrator.clone();
            let metrics = metrics.clone();
            let files = files.clone();
            Box::pin(async move {
                info!("Starting scheduled reply cycle");
                if let Some(report) =
                    run_scheduled_cycle(&orchestrator, metrics.as_ref(), &files).await
                {
                    info!("Scheduled reply cycle completed: {:?}", report);
                }
            })
        })?)
        .await?;

    info!("Cronjob scheduler configured with schedule '{}'", schedule);
    Ok(sched)
}
