//! In-process schedule store for tests and local development.
//!
//! Nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use reminder_core::types::JobId;
use reminder_entity::job::{CreateJob, JobOutcome, JobState, NotificationJob};

use super::{QueueStats, ScheduleStore};
use crate::error::StoreError;

/// Error recorded when a claimed job is recovered after its worker vanished.
const STALE_CLAIM_ERROR: &str = "worker lost during delivery attempt";

/// [`ScheduleStore`] backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryScheduleStore {
    jobs: Mutex<HashMap<JobId, NotificationJob>>,
    offline: AtomicBool,
}

impl InMemoryScheduleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

fn expect_in_flight<'a>(
    jobs: &'a mut HashMap<JobId, NotificationJob>,
    job_id: JobId,
) -> Result<&'a mut NotificationJob, StoreError> {
    let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
    if job.state != JobState::InFlight {
        return Err(StoreError::Conflict(format!(
            "job {job_id} is {}, expected in_flight",
            job.state
        )));
    }
    Ok(job)
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn enqueue(&self, job: CreateJob) -> Result<NotificationJob, StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.lock().await;
        let now = Utc::now();

        if let Some(existing) = jobs.get(&job.id) {
            if existing.state != JobState::Pending {
                return Ok(existing.clone());
            }
            let created_at = existing.created_at;
            let mut replaced = job.into_job(now);
            replaced.created_at = created_at;
            jobs.insert(replaced.id, replaced.clone());
            return Ok(replaced);
        }

        let job = job.into_job(now);
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn take_next_due(
        &self,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationJob>, StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.lock().await;

        let next = jobs
            .values()
            .filter(|job| job.is_due(now))
            .min_by_key(|job| (job.fire_at, job.created_at))
            .map(|job| job.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };

        job.state = JobState::InFlight;
        job.attempt += 1;
        job.worker_id = Some(worker_id.to_string());
        job.claimed_at = Some(now);
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn next_fire_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.check_online()?;
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .filter(|job| job.state == JobState::Pending)
            .map(|job| job.fire_at)
            .min())
    }

    async fn reenqueue(
        &self,
        job_id: JobId,
        fire_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.lock().await;
        let job = expect_in_flight(&mut jobs, job_id)?;

        job.state = JobState::Pending;
        job.fire_at = fire_at;
        job.last_error = Some(last_error.to_string());
        job.worker_id = None;
        job.claimed_at = None;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_terminal(&self, job_id: JobId, outcome: JobOutcome) -> Result<(), StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.lock().await;
        let job = expect_in_flight(&mut jobs, job_id)?;

        let now = Utc::now();
        job.state = outcome.state();
        if let Some(reason) = outcome.reason() {
            job.last_error = Some(reason.to_string());
        }
        job.worker_id = None;
        job.finished_at = Some(now);
        job.updated_at = now;
        Ok(())
    }

    async fn cancel(&self, job_id: JobId) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&job_id) {
            Some(job) if job.state == JobState::Pending => {
                let now = Utc::now();
                job.state = JobState::Cancelled;
                job.finished_at = Some(now);
                job.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, job_id: JobId) -> Result<Option<NotificationJob>, StoreError> {
        self.check_online()?;
        Ok(self.jobs.lock().await.get(&job_id).cloned())
    }

    async fn list(
        &self,
        state: Option<JobState>,
        limit: usize,
    ) -> Result<Vec<NotificationJob>, StoreError> {
        self.check_online()?;
        let jobs = self.jobs.lock().await;
        let mut listed: Vec<NotificationJob> = jobs
            .values()
            .filter(|job| state.is_none_or(|s| job.state == s))
            .cloned()
            .collect();
        listed.sort_by_key(|job| job.fire_at);
        listed.truncate(limit);
        Ok(listed)
    }

    async fn stats(&self) -> Result<QueueStats, StoreError> {
        self.check_online()?;
        let jobs = self.jobs.lock().await;
        let mut stats = QueueStats::default();
        for job in jobs.values() {
            stats.record(job.state, 1);
        }
        Ok(stats)
    }

    async fn requeue_stale(&self, claimed_before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.lock().await;
        let now = Utc::now();
        let mut recovered = 0;

        for job in jobs.values_mut() {
            let stale = job.state == JobState::InFlight
                && job.claimed_at.is_some_and(|claimed| claimed < claimed_before);
            if !stale {
                continue;
            }

            if job.has_attempts_left() {
                job.state = JobState::Pending;
            } else {
                job.state = JobState::Failed;
                job.finished_at = Some(now);
            }
            if job.last_error.is_none() {
                job.last_error = Some(STALE_CLAIM_ERROR.to_string());
            }
            job.worker_id = None;
            job.claimed_at = None;
            job.updated_at = now;
            recovered += 1;
        }

        Ok(recovered)
    }

    async fn purge_terminal(&self, finished_before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.state.is_terminal()
                && job.finished_at.is_some_and(|finished| finished < finished_before))
        });
        Ok((before - jobs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reminder_core::types::EventId;
    use reminder_entity::job::ReminderPayload;

    fn new_job(fire_at: DateTime<Utc>) -> CreateJob {
        CreateJob {
            id: JobId::new(),
            event_id: None,
            payload: ReminderPayload {
                recipient_email: "ada@example.com".into(),
                event_name: "Launch".into(),
                lead_minutes: 30,
            },
            fire_at,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_job_not_taken_before_fire_at() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        store.enqueue(new_job(now + Duration::minutes(10))).await.unwrap();

        assert!(store.take_next_due("w1", now).await.unwrap().is_none());
        let job = store
            .take_next_due("w1", now + Duration::minutes(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.state, JobState::InFlight);
        assert_eq!(job.attempt, 1);
        assert_eq!(job.worker_id.as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn test_claimed_job_is_not_handed_out_twice() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        store.enqueue(new_job(now)).await.unwrap();

        assert!(store.take_next_due("w1", now).await.unwrap().is_some());
        assert!(store.take_next_due("w2", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_earliest_fire_at_is_taken_first() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        let later = store.enqueue(new_job(now - Duration::minutes(1))).await.unwrap();
        let earlier = store.enqueue(new_job(now - Duration::minutes(5))).await.unwrap();

        let first = store.take_next_due("w", now).await.unwrap().unwrap();
        let second = store.take_next_due("w", now).await.unwrap().unwrap();
        assert_eq!(first.id, earlier.id);
        assert_eq!(second.id, later.id);
        assert_eq!(store.next_fire_at().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_replaces_pending_but_not_in_flight() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        let id = JobId::for_event(EventId::new());

        let mut first = new_job(now);
        first.id = id;
        store.enqueue(first).await.unwrap();

        let mut second = new_job(now + Duration::minutes(30));
        second.id = id;
        second.payload.event_name = "Renamed".into();
        let replaced = store.enqueue(second.clone()).await.unwrap();
        assert_eq!(replaced.event_name, "Renamed");
        assert_eq!(store.stats().await.unwrap().total(), 1);

        store
            .take_next_due("w", now + Duration::minutes(30))
            .await
            .unwrap()
            .unwrap();
        let untouched = store.enqueue(second).await.unwrap();
        assert_eq!(untouched.state, JobState::InFlight);
        assert_eq!(untouched.attempt, 1);
    }

    #[tokio::test]
    async fn test_upsert_leaves_finished_jobs_alone() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();

        for outcome in [
            JobOutcome::Delivered,
            JobOutcome::Failed {
                reason: "mailbox full".into(),
            },
        ] {
            let mut create = new_job(now);
            create.id = JobId::for_event(EventId::new());
            let job = store.enqueue(create.clone()).await.unwrap();
            store.take_next_due("w", now).await.unwrap().unwrap();
            let expected = outcome.state();
            store.mark_terminal(job.id, outcome).await.unwrap();

            create.fire_at = now + Duration::minutes(30);
            let again = store.enqueue(create).await.unwrap();
            assert_eq!(again.state, expected);
            assert_eq!(again.attempt, 1);
            assert_eq!(again.fire_at, now);
        }

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.pending, 0);
        assert!(store.take_next_due("w", now + Duration::hours(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_job_cannot_be_rescheduled() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        let job = store.enqueue(new_job(now)).await.unwrap();
        store.take_next_due("w", now).await.unwrap();
        store
            .mark_terminal(job.id, JobOutcome::Delivered)
            .await
            .unwrap();

        let err = store.reenqueue(job.id, now, "late failure").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(!store.cancel(job.id).await.unwrap());
        assert_eq!(
            store.get(job.id).await.unwrap().unwrap().state,
            JobState::Delivered
        );
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        let job = store.enqueue(new_job(now + Duration::hours(1))).await.unwrap();

        assert!(store.cancel(job.id).await.unwrap());
        assert!(!store.cancel(job.id).await.unwrap());
        assert!(!store.cancel(JobId::new()).await.unwrap());
        assert!(
            store
                .take_next_due("w", now + Duration::hours(2))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_requeue_stale_respects_budget() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();

        let retryable = store.enqueue(new_job(now)).await.unwrap();
        let mut exhausted = new_job(now);
        exhausted.max_attempts = 1;
        let exhausted = store.enqueue(exhausted).await.unwrap();

        store.take_next_due("w", now).await.unwrap();
        store.take_next_due("w", now).await.unwrap();

        let recovered = store
            .requeue_stale(now + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(recovered, 2);

        let retryable = store.get(retryable.id).await.unwrap().unwrap();
        assert_eq!(retryable.state, JobState::Pending);
        assert_eq!(retryable.attempt, 1);
        let exhausted = store.get(exhausted.id).await.unwrap().unwrap();
        assert_eq!(exhausted.state, JobState::Failed);
    }

    #[tokio::test]
    async fn test_purge_removes_only_old_terminal_jobs() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        let done = store.enqueue(new_job(now)).await.unwrap();
        store.take_next_due("w", now).await.unwrap();
        store.mark_terminal(done.id, JobOutcome::Delivered).await.unwrap();
        let pending = store.enqueue(new_job(now + Duration::hours(1))).await.unwrap();

        let purged = store
            .purge_terminal(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.get(done.id).await.unwrap().is_none());
        assert!(store.get(pending.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = InMemoryScheduleStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.enqueue(new_job(Utc::now())).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
