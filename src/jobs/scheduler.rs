use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::expired_transaction::{ExpiredTransactionReconciler, TickReport};

/// Report of the most recent completed tick, shared with the ops API
pub type LastRun = Arc<RwLock<Option<TickReport>>>;

/// Runs reconciliation ticks one at a time
#[derive(Clone)]
pub struct TickRunner {
    reconciler: Arc<ExpiredTransactionReconciler>,
    running: Arc<Mutex<()>>,
    last_run: LastRun,
}

impl TickRunner {
    pub fn new(reconciler: Arc<ExpiredTransactionReconciler>, last_run: LastRun) -> Self {
        Self {
            reconciler,
            running: Arc::new(Mutex::new(())),
            last_run,
        }
    }

    /// Runs a tick unless one is already in progress, in which case it
    /// returns `None` without doing anything.
    pub async fn tick(&self) -> Option<TickReport> {
        let Ok(_running) = self.running.try_lock() else {
            tracing::warn!("Previous reconciliation tick still running, skipping");
            return None;
        };

        let report = self.reconciler.run_tick(Utc::now()).await;
        *self.last_run.write().await = Some(report.clone());

        Some(report)
    }
}

/// Starts a scheduler that fires a tick every `interval`, plus one right away.
pub async fn start_scheduler(
    runner: TickRunner,
    interval: Duration,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job_runner = runner.clone();
    let job = Job::new_repeated_async(interval, move |_job_id, _scheduler| {
        let runner = job_runner.clone();
        Box::pin(async move {
            runner.tick().await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(
        interval_ms = interval.as_millis(),
        "Reconciliation scheduler started"
    );

    tokio::spawn(async move {
        runner.tick().await;
    });

    Ok(scheduler)
}
