//! Event repository implementation.

use sqlx::PgPool;

use reminder_core::error::{AppError, ErrorKind};
use reminder_core::result::AppResult;
use reminder_core::types::{EventId, UserId};
use reminder_entity::event::{CreateEvent, Event};

/// Repository for event records.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find event", e))
    }

    /// All events of a user, earliest first.
    pub async fn find_by_user(&self, user_id: UserId) -> AppResult<Vec<Event>> {
        sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE user_id = $1 ORDER BY event_date ASC, event_time ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list events", e))
    }

    /// Insert a new event.
    pub async fn create(&self, data: &CreateEvent) -> AppResult<Event> {
        sqlx::query_as::<_, Event>(
            "INSERT INTO events (id, name, venue, duration, should_notify, notify_before_minutes, \
             event_date, event_time, user_id, reminder_job_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(data.id)
        .bind(&data.name)
        .bind(&data.venue)
        .bind(data.duration)
        .bind(data.should_notify)
        .bind(data.notify_before_minutes)
        .bind(data.event_date)
        .bind(data.event_time)
        .bind(data.user_id)
        .bind(data.reminder_job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create event", e))
    }

    /// Delete an event. Returns `false` if it did not exist.
    pub async fn delete(&self, id: EventId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete event", e))?;
        Ok(result.rows_affected() > 0)
    }
}
