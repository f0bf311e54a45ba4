//! Event record entity model.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use reminder_core::types::{EventId, JobId, UserId};

/// A user's time-bound event.
///
/// Date and time are stored without a timezone; they are interpreted in the
/// server's local frame when a reminder is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Event name.
    pub name: String,
    /// Where the event takes place.
    pub venue: String,
    /// Duration in minutes.
    pub duration: i32,
    /// Whether a reminder email was requested.
    pub should_notify: bool,
    /// Minutes before the start the reminder fires.
    pub notify_before_minutes: i32,
    /// Calendar date of the event.
    pub event_date: NaiveDate,
    /// Local start time of the event.
    pub event_time: NaiveTime,
    /// Owner.
    pub user_id: UserId,
    /// Pending reminder for this event, if one was scheduled.
    pub reminder_job_id: Option<JobId>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to persist a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEvent {
    /// Pre-assigned id, so a reminder can be keyed to the event before insert.
    pub id: EventId,
    /// Event name.
    pub name: String,
    /// Venue.
    pub venue: String,
    /// Duration in minutes.
    pub duration: i32,
    /// Whether a reminder was requested.
    pub should_notify: bool,
    /// Lead minutes for the reminder.
    pub notify_before_minutes: i32,
    /// Calendar date.
    pub event_date: NaiveDate,
    /// Local start time.
    pub event_time: NaiveTime,
    /// Owner.
    pub user_id: UserId,
    /// Reminder job scheduled for the event.
    pub reminder_job_id: Option<JobId>,
}

impl CreateEvent {
    /// Build the stored record this request describes.
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            id: self.id,
            name: self.name,
            venue: self.venue,
            duration: self.duration,
            should_notify: self.should_notify,
            notify_before_minutes: self.notify_before_minutes,
            event_date: self.event_date,
            event_time: self.event_time,
            user_id: self.user_id,
            reminder_job_id: self.reminder_job_id,
            created_at: now,
            updated_at: now,
        }
    }
}
