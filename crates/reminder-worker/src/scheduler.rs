//! Reminder scheduling: the producer side of the queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::Notify;
use tracing::{info, warn};

use reminder_core::config::NotifyConfig;
use reminder_core::types::{EventId, JobId};
use reminder_entity::job::{CreateJob, JobState, ReminderPayload};

use crate::clock::Clock;
use crate::delay::{Delay, compute_delay, parse_event_date, parse_event_time};
use crate::error::ScheduleError;
use crate::events::{JobEvent, JobEvents};
use crate::store::ScheduleStore;

/// What to remind whom about, and when the event starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    /// Address the reminder goes to.
    pub recipient_email: String,
    /// Event name shown in the message.
    pub event_name: String,
    /// Minutes before the start to send the reminder.
    pub lead_minutes: u32,
    /// `YYYY-MM-DD`.
    pub event_date: String,
    /// `HH:MM`.
    pub event_time: String,
    /// Owning event. When set, the job id is derived from it and a repeated
    /// call replaces the earlier reminder instead of adding a second one.
    pub event_id: Option<EventId>,
}

/// A scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: JobId,
    pub fire_at: DateTime<Utc>,
}

/// Result of a successful [`ReminderScheduler::schedule`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A job was enqueued.
    Scheduled(JobHandle),
    /// The notify window already passed; nothing was enqueued.
    Skipped,
}

impl ScheduleOutcome {
    /// The job handle, if one was scheduled.
    pub fn handle(&self) -> Option<JobHandle> {
        match self {
            Self::Scheduled(handle) => Some(*handle),
            Self::Skipped => None,
        }
    }
}

/// Computes fire times and enqueues reminder jobs.
pub struct ReminderScheduler {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    config: NotifyConfig,
    events: JobEvents,
    wakeup: Option<Arc<Notify>>,
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReminderScheduler {
    /// Create a scheduler writing to `store`.
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>, config: NotifyConfig) -> Self {
        Self {
            store,
            clock,
            config,
            events: JobEvents::new(),
            wakeup: None,
        }
    }

    /// Publish lifecycle events on `events`.
    pub fn with_events(mut self, events: JobEvents) -> Self {
        self.events = events;
        self
    }

    /// Wake idle workers after every enqueue.
    pub fn with_wakeup(mut self, wakeup: Arc<Notify>) -> Self {
        self.wakeup = Some(wakeup);
        self
    }

    /// Notify settings in effect.
    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// Schedule a reminder `lead_minutes` before the event starts.
    ///
    /// Returns [`ScheduleOutcome::Skipped`] without touching the store when
    /// that instant is not in the future.
    pub async fn schedule(&self, request: ScheduleRequest) -> Result<ScheduleOutcome, ScheduleError> {
        let recipient = request.recipient_email.trim();
        if recipient.is_empty() {
            return Err(ScheduleError::InvalidRecipient(
                request.recipient_email.clone(),
            ));
        }

        let date = parse_event_date(&request.event_date)?;
        let time = parse_event_time(&request.event_time)?;
        if i32::try_from(request.lead_minutes).is_err() {
            return Err(ScheduleError::InvalidSchedule(format!(
                "lead of {} minutes is too large",
                request.lead_minutes
            )));
        }

        let now = self.clock.now();
        let local_now = now.with_timezone(&Local).naive_local();
        let delay = match compute_delay(date, time, request.lead_minutes, local_now) {
            Delay::Wait(delay) => delay,
            Delay::Late => {
                info!(
                    recipient = %recipient,
                    event = %request.event_name,
                    event_date = %date,
                    event_time = %time,
                    lead_minutes = request.lead_minutes,
                    "Notify window already passed, reminder skipped"
                );
                return Ok(ScheduleOutcome::Skipped);
            }
        };

        let job_id = match request.event_id {
            Some(event_id) => JobId::for_event(event_id),
            None => JobId::new(),
        };
        let create = CreateJob {
            id: job_id,
            event_id: request.event_id,
            payload: ReminderPayload {
                recipient_email: recipient.to_string(),
                event_name: request.event_name,
                lead_minutes: request.lead_minutes,
            },
            fire_at: now + delay,
            max_attempts: i32::try_from(self.config.max_attempts.max(1)).unwrap_or(i32::MAX),
        };

        let timeout = Duration::from_millis(self.config.enqueue_timeout_ms);
        let job = match tokio::time::timeout(timeout, self.store.enqueue(create)).await {
            Ok(Ok(job)) => job,
            Ok(Err(e)) => {
                warn!(job_id = %job_id, error = %e, "Failed to enqueue reminder");
                return Err(ScheduleError::StoreUnavailable(e.to_string()));
            }
            Err(_) => {
                warn!(job_id = %job_id, timeout_ms = self.config.enqueue_timeout_ms, "Enqueue timed out");
                return Err(ScheduleError::StoreUnavailable(format!(
                    "enqueue timed out after {}ms",
                    self.config.enqueue_timeout_ms
                )));
            }
        };

        if job.state == JobState::InFlight {
            warn!(
                job_id = %job.id,
                "Reminder is being delivered right now, existing job kept"
            );
        } else if job.state.is_terminal() {
            info!(
                job_id = %job.id,
                state = %job.state,
                "Reminder already finished, existing job kept"
            );
        } else {
            info!(
                job_id = %job.id,
                recipient = %job.recipient_email,
                fire_at = %job.fire_at,
                max_attempts = job.max_attempts,
                "Reminder enqueued"
            );
            self.events.emit(JobEvent::Enqueued {
                job_id: job.id,
                fire_at: job.fire_at,
            });
            if let Some(wakeup) = &self.wakeup {
                wakeup.notify_one();
            }
        }

        Ok(ScheduleOutcome::Scheduled(JobHandle {
            job_id: job.id,
            fire_at: job.fire_at,
        }))
    }

    /// Cancel a pending reminder. Returns `false` if it was not pending.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool, ScheduleError> {
        let cancelled = self
            .store
            .cancel(job_id)
            .await
            .map_err(|e| ScheduleError::StoreUnavailable(e.to_string()))?;

        if cancelled {
            info!(job_id = %job_id, "Reminder cancelled");
            self.events.emit(JobEvent::Cancelled { job_id });
        }
        Ok(cancelled)
    }

    /// Cancel the reminder scheduled for `event_id`, if still pending.
    pub async fn cancel_for_event(&self, event_id: EventId) -> Result<bool, ScheduleError> {
        self.cancel(JobId::for_event(event_id)).await
    }
}
