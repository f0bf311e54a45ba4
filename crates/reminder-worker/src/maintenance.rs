//! Periodic queue maintenance: stale claim recovery and purging.

use std::sync::Arc;

use chrono::Duration;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use reminder_core::config::NotifyConfig;
use reminder_core::error::AppError;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::store::ScheduleStore;

/// Every minute, at second zero.
const REQUEUE_STALE_SCHEDULE: &str = "0 * * * * *";
/// Daily at 03:00 UTC.
const PURGE_SCHEDULE: &str = "0 0 3 * * *";

/// The maintenance operations themselves, callable with or without cron.
#[derive(Clone)]
pub struct MaintenanceTasks {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
    retention: Duration,
}

impl std::fmt::Debug for MaintenanceTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceTasks")
            .field("stale_after", &self.stale_after)
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl MaintenanceTasks {
    /// Create the task set from the notify section.
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>, config: &NotifyConfig) -> Self {
        Self {
            store,
            clock,
            stale_after: i64::try_from(config.stale_after_seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::minutes(10)),
            retention: Duration::days(i64::from(config.retention_days)),
        }
    }

    /// Return jobs stuck in flight longer than `stale_after` to the queue.
    pub async fn requeue_stale(&self) -> Result<u64, StoreError> {
        let cutoff = self.clock.now() - self.stale_after;
        let recovered = self.store.requeue_stale(cutoff).await?;
        if recovered > 0 {
            tracing::warn!(recovered, cutoff = %cutoff, "Recovered stale in-flight reminders");
        }
        Ok(recovered)
    }

    /// Delete terminal jobs older than the retention window.
    pub async fn purge(&self) -> Result<u64, StoreError> {
        self.purge_older_than(self.retention).await
    }

    /// Delete terminal jobs that finished more than `age` ago.
    pub async fn purge_older_than(&self, age: Duration) -> Result<u64, StoreError> {
        let cutoff = self.clock.now() - age;
        let purged = self.store.purge_terminal(cutoff).await?;
        tracing::info!(purged, cutoff = %cutoff, "Purged finished reminders");
        Ok(purged)
    }
}

/// Cron scheduler running [`MaintenanceTasks`].
pub struct MaintenanceScheduler {
    scheduler: JobScheduler,
    tasks: MaintenanceTasks,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl MaintenanceScheduler {
    /// Create a new cron scheduler.
    pub async fn new(tasks: MaintenanceTasks) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, tasks })
    }

    /// Register all maintenance tasks.
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        self.register_requeue_stale().await?;
        self.register_purge().await?;

        tracing::info!("All maintenance tasks registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Maintenance scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Maintenance scheduler shut down");
        Ok(())
    }

    async fn register_requeue_stale(&self) -> Result<(), AppError> {
        let tasks = self.tasks.clone();
        let job = CronJob::new_async(REQUEUE_STALE_SCHEDULE, move |_uuid, _lock| {
            let tasks = tasks.clone();
            Box::pin(async move {
                if let Err(e) = tasks.requeue_stale().await {
                    tracing::error!(error = %e, "Stale reminder recovery failed");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create requeue_stale schedule: {e}")))?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add requeue_stale schedule: {e}"))
        })?;

        tracing::info!("Registered: requeue_stale (every minute)");
        Ok(())
    }

    async fn register_purge(&self) -> Result<(), AppError> {
        let tasks = self.tasks.clone();
        let job = CronJob::new_async(PURGE_SCHEDULE, move |_uuid, _lock| {
            let tasks = tasks.clone();
            Box::pin(async move {
                if let Err(e) = tasks.purge().await {
                    tracing::error!(error = %e, "Reminder purge failed");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create purge schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add purge schedule: {e}")))?;

        tracing::info!("Registered: purge_terminal (daily at 03:00)");
        Ok(())
    }
}
