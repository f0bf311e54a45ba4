//! Reminder job repository: durable queue operations over `reminder_jobs`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use reminder_core::error::{AppError, ErrorKind};
use reminder_core::result::AppResult;
use reminder_core::types::JobId;
use reminder_entity::job::{CreateJob, JobState, NotificationJob};

/// Error text recorded when a claimed job is recovered after its worker vanished.
const STALE_CLAIM_ERROR: &str = "worker lost during delivery attempt";

/// Repository for reminder job persistence and claiming.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a job by ID.
    pub async fn find_by_id(&self, id: JobId) -> AppResult<Option<NotificationJob>> {
        sqlx::query_as::<_, NotificationJob>("SELECT * FROM reminder_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// List jobs, optionally restricted to one state, soonest fire time first.
    pub async fn list(
        &self,
        state: Option<JobState>,
        limit: i64,
    ) -> AppResult<Vec<NotificationJob>> {
        sqlx::query_as::<_, NotificationJob>(
            "SELECT * FROM reminder_jobs \
             WHERE ($1::reminder_job_state IS NULL OR state = $1) \
             ORDER BY fire_at ASC LIMIT $2",
        )
        .bind(state)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }

    /// Count jobs grouped by state.
    pub async fn count_by_state(&self) -> AppResult<Vec<(JobState, i64)>> {
        sqlx::query_as::<_, (JobState, i64)>(
            "SELECT state, COUNT(*) FROM reminder_jobs GROUP BY state",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }

    /// Insert a job, or replace a still-pending job with the same id.
    ///
    /// A job that is `in_flight` or already finished is left untouched; the
    /// stored row is returned instead.
    pub async fn upsert(&self, data: &CreateJob) -> AppResult<NotificationJob> {
        let lead_minutes = i32::try_from(data.payload.lead_minutes)
            .map_err(|_| AppError::validation("Lead time does not fit in a job row"))?;
        let written = sqlx::query_as::<_, NotificationJob>(
            "INSERT INTO reminder_jobs \
                (id, event_id, recipient_email, event_name, lead_minutes, fire_at, max_attempts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                event_id = EXCLUDED.event_id, \
                recipient_email = EXCLUDED.recipient_email, \
                event_name = EXCLUDED.event_name, \
                lead_minutes = EXCLUDED.lead_minutes, \
                fire_at = EXCLUDED.fire_at, \
                max_attempts = EXCLUDED.max_attempts, \
                attempt = 0, state = 'pending', last_error = NULL, worker_id = NULL, \
                claimed_at = NULL, finished_at = NULL, updated_at = NOW() \
             WHERE reminder_jobs.state = 'pending' \
             RETURNING *",
        )
        .bind(data.id)
        .bind(data.event_id)
        .bind(&data.payload.recipient_email)
        .bind(&data.payload.event_name)
        .bind(lead_minutes)
        .bind(data.fire_at)
        .bind(data.max_attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enqueue job", e))?;

        match written {
            Some(job) => Ok(job),
            None => self.find_by_id(data.id).await?.ok_or_else(|| {
                AppError::conflict(format!("Job {} vanished during enqueue", data.id))
            }),
        }
    }

    /// Claim the earliest due pending job (SKIP LOCKED for concurrency).
    ///
    /// The claim moves the job to `in_flight` and counts the attempt.
    pub async fn claim_next_due(
        &self,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<NotificationJob>> {
        sqlx::query_as::<_, NotificationJob>(
            "UPDATE reminder_jobs SET state = 'in_flight', attempt = attempt + 1, \
             worker_id = $1, claimed_at = $2, updated_at = NOW() \
             WHERE id = ( \
                SELECT id FROM reminder_jobs \
                WHERE state = 'pending' AND fire_at <= $2 \
                ORDER BY fire_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    /// Earliest fire time among pending jobs.
    pub async fn next_fire_at(&self) -> AppResult<Option<DateTime<Utc>>> {
        sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MIN(fire_at) FROM reminder_jobs WHERE state = 'pending'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read next fire time", e))
    }

    /// Return an in-flight job to `pending` with a new fire time.
    ///
    /// Returns `false` when the job is not in flight.
    pub async fn reschedule(
        &self,
        id: JobId,
        fire_at: DateTime<Utc>,
        last_error: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE reminder_jobs SET state = 'pending', fire_at = $2, last_error = $3, \
             worker_id = NULL, claimed_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND state = 'in_flight'",
        )
        .bind(id)
        .bind(fire_at)
        .bind(last_error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reschedule job", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an in-flight job to a terminal state.
    pub async fn finish(
        &self,
        id: JobId,
        state: JobState,
        last_error: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE reminder_jobs SET state = $2, last_error = COALESCE($3, last_error), \
             worker_id = NULL, finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND state = 'in_flight'",
        )
        .bind(id)
        .bind(state)
        .bind(last_error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to finish job", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancel a pending job. Returns `false` if it was not pending.
    pub async fn cancel(&self, id: JobId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE reminder_jobs SET state = 'cancelled', finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND state = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cancel job", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Recover jobs claimed before `cutoff` whose worker never reported back.
    ///
    /// Jobs with attempts left return to `pending`; the rest fail.
    pub async fn requeue_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE reminder_jobs SET \
                state = CASE WHEN attempt < max_attempts \
                    THEN 'pending'::reminder_job_state ELSE 'failed'::reminder_job_state END, \
                finished_at = CASE WHEN attempt < max_attempts THEN NULL ELSE NOW() END, \
                last_error = COALESCE(last_error, $2), \
                worker_id = NULL, claimed_at = NULL, updated_at = NOW() \
             WHERE state = 'in_flight' AND claimed_at < $1",
        )
        .bind(cutoff)
        .bind(STALE_CLAIM_ERROR)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to requeue stale jobs", e)
        })?;
        Ok(result.rows_affected())
    }

    /// Delete terminal jobs that finished before `before`.
    pub async fn purge_terminal(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM reminder_jobs \
             WHERE state IN ('delivered', 'failed', 'cancelled') AND finished_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to purge jobs", e))?;
        Ok(result.rows_affected())
    }
}
