//! The durable, time-ordered queue of reminder jobs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use reminder_core::types::JobId;
use reminder_entity::job::{CreateJob, JobOutcome, JobState, NotificationJob};

use crate::error::StoreError;

pub use memory::InMemoryScheduleStore;
pub use postgres::PgScheduleStore;

/// Job counts per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: u64,
    pub in_flight: u64,
    pub delivered: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl QueueStats {
    /// Add `count` jobs in `state`.
    pub fn record(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Pending => self.pending += count,
            JobState::InFlight => self.in_flight += count,
            JobState::Delivered => self.delivered += count,
            JobState::Failed => self.failed += count,
            JobState::Cancelled => self.cancelled += count,
        }
    }

    /// Total number of jobs.
    pub fn total(&self) -> u64 {
        self.pending + self.in_flight + self.delivered + self.failed + self.cancelled
    }
}

/// Persistent queue of notification jobs shared by schedulers and workers.
///
/// Implementations must hand a given job to at most one caller of
/// [`take_next_due`](Self::take_next_due) at a time.
#[async_trait]
pub trait ScheduleStore: Send + Sync + 'static {
    /// Insert a `Pending` job with no attempts.
    ///
    /// A `Pending` job with the same id is replaced. Any other existing job
    /// (in flight or terminal) is returned unchanged.
    async fn enqueue(&self, job: CreateJob) -> Result<NotificationJob, StoreError>;

    /// Claim the earliest pending job with `fire_at <= now`.
    ///
    /// The claimed job is `InFlight` with its attempt counter incremented.
    async fn take_next_due(
        &self,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationJob>, StoreError>;

    /// Earliest fire time among pending jobs.
    async fn next_fire_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Return an in-flight job to `Pending`, due at `fire_at`.
    async fn reenqueue(
        &self,
        job_id: JobId,
        fire_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<(), StoreError>;

    /// Record the final outcome of an in-flight job.
    async fn mark_terminal(&self, job_id: JobId, outcome: JobOutcome) -> Result<(), StoreError>;

    /// Cancel a pending job. Returns `false` if the job is not pending.
    async fn cancel(&self, job_id: JobId) -> Result<bool, StoreError>;

    /// Look a job up by id.
    async fn get(&self, job_id: JobId) -> Result<Option<NotificationJob>, StoreError>;

    /// Jobs ordered by fire time, optionally restricted to one state.
    async fn list(
        &self,
        state: Option<JobState>,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, StoreError>;

    /// Job counts per state.
    async fn stats(&self) -> Result<QueueStats, StoreError>;

    /// Recover in-flight jobs claimed before `claimed_before`.
    ///
    /// Jobs with attempts left go back to `Pending`; the rest become `Failed`.
    async fn requeue_stale(&self, claimed_before: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Delete terminal jobs that finished before `finished_before`.
    async fn purge_terminal(&self, finished_before: DateTime<Utc>) -> Result<u64, StoreError>;
}
