//! PostgreSQL-backed schedule store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use reminder_core::types::JobId;
use reminder_database::repositories::JobRepository;
use reminder_entity::job::{CreateJob, JobOutcome, JobState, NotificationJob};

use super::{QueueStats, ScheduleStore};
use crate::error::StoreError;

/// [`ScheduleStore`] over the `reminder_jobs` table.
///
/// Claims use `FOR UPDATE SKIP LOCKED`, so any number of workers in any
/// number of processes may share one database.
#[derive(Debug, Clone)]
pub struct PgScheduleStore {
    repo: Arc<JobRepository>,
}

impl PgScheduleStore {
    /// Create a store over the given repository.
    pub fn new(repo: Arc<JobRepository>) -> Self {
        Self { repo }
    }

    /// Explain why a state-guarded update matched no row.
    async fn explain_miss(&self, job_id: JobId, expected: JobState) -> StoreError {
        match self.repo.find_by_id(job_id).await {
            Ok(Some(job)) => StoreError::Conflict(format!(
                "job {job_id} is {}, expected {expected}",
                job.state
            )),
            Ok(None) => StoreError::NotFound(job_id),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl ScheduleStore for PgScheduleStore {
    async fn enqueue(&self, job: CreateJob) -> Result<NotificationJob, StoreError> {
        let job = self.repo.upsert(&job).await?;
        debug!(job_id = %job.id, state = %job.state, "Job row written");
        Ok(job)
    }

    async fn take_next_due(
        &self,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationJob>, StoreError> {
        Ok(self.repo.claim_next_due(worker_id, now).await?)
    }

    async fn next_fire_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.repo.next_fire_at().await?)
    }

    async fn reenqueue(
        &self,
        job_id: JobId,
        fire_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<(), StoreError> {
        if self.repo.reschedule(job_id, fire_at, last_error).await? {
            Ok(())
        } else {
            Err(self.explain_miss(job_id, JobState::InFlight).await)
        }
    }

    async fn mark_terminal(&self, job_id: JobId, outcome: JobOutcome) -> Result<(), StoreError> {
        if self
            .repo
            .finish(job_id, outcome.state(), outcome.reason())
            .await?
        {
            Ok(())
        } else {
            Err(self.explain_miss(job_id, JobState::InFlight).await)
        }
    }

    async fn cancel(&self, job_id: JobId) -> Result<bool, StoreError> {
        Ok(self.repo.cancel(job_id).await?)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<NotificationJob>, StoreError> {
        Ok(self.repo.find_by_id(job_id).await?)
    }

    async fn list(
        &self,
        state: Option<JobState>,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(self.repo.list(state, limit).await?)
    }

    async fn stats(&self) -> Result<QueueStats, StoreError> {
        let mut stats = QueueStats::default();
        for (state, count) in self.repo.count_by_state().await? {
            stats.record(state, count.max(0) as u64);
        }
        Ok(stats)
    }

    async fn requeue_stale(&self, claimed_before: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self.repo.requeue_stale(claimed_before).await?)
    }

    async fn purge_terminal(&self, finished_before: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self.repo.purge_terminal(finished_before).await?)
    }
}
