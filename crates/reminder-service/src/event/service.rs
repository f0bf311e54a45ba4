//! Event use cases.

use std::sync::Arc;

use tracing::{error, info, warn};
use validator::Validate;

use reminder_core::error::AppError;
use reminder_core::types::EventId;
use reminder_entity::event::{CreateEvent, Event};
use reminder_worker::{
    JobHandle, ReminderScheduler, ScheduleOutcome, ScheduleRequest, parse_event_date,
    parse_event_time,
};

use super::request::CreateEventRequest;
use super::store::EventStore;
use crate::context::Identity;

/// What happened to the reminder of a newly created event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderStatus {
    /// Notifications were not requested.
    Disabled,
    /// The notify window had already passed.
    Skipped,
    /// A reminder job is pending.
    Scheduled(JobHandle),
}

/// A persisted event and the state of its reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub event: Event,
    pub reminder: ReminderStatus,
}

/// Creates, lists, and deletes events, keeping their reminders in step.
pub struct EventService {
    store: Arc<dyn EventStore>,
    scheduler: Arc<ReminderScheduler>,
}

impl std::fmt::Debug for EventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventService")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl EventService {
    /// Creates a new event service.
    pub fn new(store: Arc<dyn EventStore>, scheduler: Arc<ReminderScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Creates an event and, if requested, schedules its reminder.
    ///
    /// The reminder is scheduled before the event row is written. If the
    /// schedule store is unreachable the request fails and nothing is
    /// written; if the write fails the reminder is cancelled again.
    pub async fn create_event(
        &self,
        identity: &Identity,
        req: CreateEventRequest,
    ) -> Result<CreatedEvent, AppError> {
        req.validate()
            .map_err(|e| AppError::validation(format!("Missing or invalid required fields: {e}")))?;

        let event_date = parse_event_date(&req.event_date)?;
        let event_time = parse_event_time(&req.event_time)?;
        let lead_minutes = req.lead_minutes(self.scheduler.config().default_lead_minutes);
        let notify_before_minutes = i32::try_from(lead_minutes)
            .map_err(|_| AppError::validation("Missing or invalid required fields: lead time is too large"))?;
        let event_id = EventId::new();

        let reminder = if req.should_notify {
            let outcome = self
                .scheduler
                .schedule(ScheduleRequest {
                    recipient_email: identity.email.clone(),
                    event_name: req.name.clone(),
                    lead_minutes,
                    event_date: req.event_date.clone(),
                    event_time: req.event_time.clone(),
                    event_id: Some(event_id),
                })
                .await?;

            match outcome {
                ScheduleOutcome::Scheduled(handle) => ReminderStatus::Scheduled(handle),
                ScheduleOutcome::Skipped => {
                    warn!(
                        event_id = %event_id,
                        user_id = %identity.user_id,
                        "Notification time already passed, reminder skipped"
                    );
                    ReminderStatus::Skipped
                }
            }
        } else {
            ReminderStatus::Disabled
        };

        let job_id = match reminder {
            ReminderStatus::Scheduled(handle) => Some(handle.job_id),
            _ => None,
        };

        let create = CreateEvent {
            id: event_id,
            name: req.name,
            venue: req.venue,
            duration: req.duration,
            should_notify: req.should_notify,
            notify_before_minutes,
            event_date,
            event_time,
            user_id: identity.user_id,
            reminder_job_id: job_id,
        };

        let event = match self.store.insert(create).await {
            Ok(event) => event,
            Err(e) => {
                if let Some(job_id) = job_id {
                    if let Err(cancel_err) = self.scheduler.cancel(job_id).await {
                        error!(
                            job_id = %job_id,
                            error = %cancel_err,
                            "Failed to cancel reminder of unsaved event"
                        );
                    }
                }
                return Err(e);
            }
        };

        info!(
            event_id = %event.id,
            user_id = %event.user_id,
            reminder_job_id = ?event.reminder_job_id,
            "Event created"
        );

        Ok(CreatedEvent { event, reminder })
    }

    /// Lists the caller's events, earliest first.
    pub async fn list_events(&self, identity: &Identity) -> Result<Vec<Event>, AppError> {
        self.store.list_by_user(identity.user_id).await
    }

    /// Deletes one of the caller's events and cancels its pending reminder.
    pub async fn delete_event(
        &self,
        identity: &Identity,
        event_id: EventId,
    ) -> Result<(), AppError> {
        let event = self
            .store
            .find_by_id(event_id)
            .await?
            .filter(|event| event.user_id == identity.user_id)
            .ok_or_else(|| AppError::not_found("Event not found or unauthorized"))?;

        if let Some(job_id) = event.reminder_job_id {
            let cancelled = self.scheduler.cancel(job_id).await?;
            if !cancelled {
                info!(event_id = %event_id, job_id = %job_id, "Reminder already sent or finished");
            }
        }

        self.store.delete(event_id).await?;
        info!(event_id = %event_id, user_id = %identity.user_id, "Event deleted");
        Ok(())
    }
}
