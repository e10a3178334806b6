pub mod daily_aggregation;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::aggregation::Aggregator;
use crate::config::{AggregationConfig, WorkerConfig};
use crate::store::Store;

pub const DAILY_AGGREGATION_JOB: &str = "daily_aggregation";

/// Upper bound for one refresh pass over all tracked users.
const RUN_TIMEOUT: Duration = Duration::from_secs(300);

/// Grace period for an in-flight pass before the scheduler stops.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the daily aggregation refresh on a cron schedule on the leader process.
pub struct WorkerManager {
    store: Arc<Store>,
    aggregator: Aggregator,
    shutdown_rx: broadcast::Receiver<()>,
    worker: WorkerConfig,
    aggregation: AggregationConfig,
}

impl WorkerManager {
    pub fn new(
        store: Arc<Store>,
        aggregator: Aggregator,
        shutdown_rx: broadcast::Receiver<()>,
        worker: &WorkerConfig,
        aggregation: &AggregationConfig,
    ) -> Self {
        Self {
            store,
            aggregator,
            shutdown_rx,
            worker: worker.clone(),
            aggregation: aggregation.clone(),
        }
    }

    /// Cron expression of the refresh job; `None` when this process is not the leader.
    pub fn schedule(&self) -> Option<&str> {
        self.worker
            .is_leader
            .then_some(self.worker.daily_aggregation_cron.as_str())
    }

    /// Schedule the refresh and block until shutdown is signalled.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(cron) = self.schedule().map(str::to_owned) else {
            tracing::info!("Worker leader disabled; daily aggregation not scheduled");
            return Ok(());
        };

        let mut scheduler = JobScheduler::new().await?;
        scheduler.add(self.refresh_job(&cron)?).await?;
        scheduler.start().await?;
        tracing::info!(job = DAILY_AGGREGATION_JOB, %cron, "Daily aggregation scheduled");

        let _ = self.shutdown_rx.recv().await;
        tracing::info!(
            drain_secs = DRAIN_TIMEOUT.as_secs(),
            "Stopping daily aggregation scheduler"
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler shutdown failed");
        }
        Ok(())
    }

    /// One pass at a time; a tick arriving while a pass runs is skipped.
    fn refresh_job(&self, cron: &str) -> Result<Job, JobSchedulerError> {
        let running = Arc::new(AtomicBool::new(false));
        let store = self.store.clone();
        let aggregator = self.aggregator.clone();
        let config = self.aggregation.clone();

        Job::new_async(cron, move |_id, _scheduler| {
            let running = running.clone();
            let store = store.clone();
            let aggregator = aggregator.clone();
            let config = config.clone();

            Box::pin(async move {
                if running.swap(true, Ordering::SeqCst) {
                    tracing::warn!(
                        job = DAILY_AGGREGATION_JOB,
                        "Previous refresh still running, skipping tick"
                    );
                    return;
                }

                let pass = daily_aggregation::run(&store, &aggregator, &config);
                match tokio::time::timeout(RUN_TIMEOUT, pass).await {
                    Ok(summary) => tracing::debug!(?summary, "Refresh pass finished"),
                    Err(_) => tracing::error!(
                        job = DAILY_AGGREGATION_JOB,
                        timeout_secs = RUN_TIMEOUT.as_secs(),
                        "Refresh pass timed out"
                    ),
                }
                running.store(false, Ordering::SeqCst);
            })
        })
    }
}
