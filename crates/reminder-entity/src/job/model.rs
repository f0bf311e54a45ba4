//! Notification job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use reminder_core::types::{EventId, JobId};

use super::status::JobState;

/// One scheduled email reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NotificationJob {
    /// Unique job identifier, assigned at enqueue time.
    pub id: JobId,
    /// Event this reminder belongs to, when known.
    pub event_id: Option<EventId>,
    /// Address the reminder is sent to.
    pub recipient_email: String,
    /// Event name used in the subject and body.
    pub event_name: String,
    /// Minutes before the event the reminder fires (echoed in the body).
    pub lead_minutes: i32,
    /// The job is never dispatched before this instant.
    pub fire_at: DateTime<Utc>,
    /// Delivery attempts made so far.
    pub attempt: i32,
    /// Retry budget.
    pub max_attempts: i32,
    /// Current lifecycle state.
    pub state: JobState,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
    /// Worker holding the job while in flight.
    pub worker_id: Option<String>,
    /// When the current attempt was claimed.
    pub claimed_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl NotificationJob {
    /// The message data carried by this job.
    pub fn payload(&self) -> ReminderPayload {
        ReminderPayload {
            recipient_email: self.recipient_email.clone(),
            event_name: self.event_name.clone(),
            lead_minutes: self.lead_minutes.max(0) as u32,
        }
    }

    /// Whether the job may be claimed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == JobState::Pending && self.fire_at <= now
    }

    /// Whether another attempt is allowed after the current one fails.
    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

/// The data a reminder email is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    /// Recipient address.
    pub recipient_email: String,
    /// Human-readable event name.
    pub event_name: String,
    /// Minutes before the event the reminder fires.
    pub lead_minutes: u32,
}

/// Data required to enqueue a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJob {
    /// Job id: random, or derived from `event_id` for upsert semantics.
    pub id: JobId,
    /// Owning event, when scheduled from an event record.
    pub event_id: Option<EventId>,
    /// Message data.
    pub payload: ReminderPayload,
    /// Absolute fire time.
    pub fire_at: DateTime<Utc>,
    /// Retry budget.
    pub max_attempts: i32,
}

impl CreateJob {
    /// Build the `Pending` job this request describes.
    pub fn into_job(self, now: DateTime<Utc>) -> NotificationJob {
        NotificationJob {
            id: self.id,
            event_id: self.event_id,
            recipient_email: self.payload.recipient_email,
            event_name: self.payload.event_name,
            lead_minutes: i32::try_from(self.payload.lead_minutes).unwrap_or(i32::MAX),
            fire_at: self.fire_at,
            attempt: 0,
            max_attempts: self.max_attempts,
            state: JobState::Pending,
            last_error: None,
            worker_id: None,
            claimed_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
