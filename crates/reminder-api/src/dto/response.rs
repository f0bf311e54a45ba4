//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use reminder_core::types::JobId;
use reminder_entity::event::Event;
use reminder_service::{CreatedEvent, ReminderStatus};
use reminder_worker::QueueStats;

/// Reminder state reported with a newly created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSummary {
    /// `scheduled`, `skipped`, or `disabled`.
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_at: Option<DateTime<Utc>>,
}

impl From<ReminderStatus> for ReminderSummary {
    fn from(status: ReminderStatus) -> Self {
        match status {
            ReminderStatus::Disabled => Self {
                state: "disabled",
                job_id: None,
                fire_at: None,
            },
            ReminderStatus::Skipped => Self {
                state: "skipped",
                job_id: None,
                fire_at: None,
            },
            ReminderStatus::Scheduled(handle) => Self {
                state: "scheduled",
                job_id: Some(handle.job_id),
                fire_at: Some(handle.fire_at),
            },
        }
    }
}

/// `POST /api/events` response.
#[derive(Debug, Clone, Serialize)]
pub struct CreateEventResponse {
    pub event: Event,
    pub status: &'static str,
    pub reminder: ReminderSummary,
}

impl From<CreatedEvent> for CreateEventResponse {
    fn from(created: CreatedEvent) -> Self {
        Self {
            event: created.event,
            status: "success",
            reminder: created.reminder.into(),
        }
    }
}

/// `DELETE /api/events/{id}` response.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `ok` when the process is serving.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Queue depth per state, absent when the store could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueStats>,
}
