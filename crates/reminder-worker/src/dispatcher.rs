//! Delivery of one claimed job.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use reminder_entity::job::{JobOutcome, NotificationJob};
use reminder_mail::{MailError, MailTransport, render_reminder};

use crate::backoff::RetryPolicy;
use crate::clock::Clock;
use crate::events::{JobEvent, JobEvents};
use crate::store::ScheduleStore;

/// What happened to a job after one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The transport accepted the reminder.
    Delivered,
    /// The attempt failed and the job was re-queued.
    Retrying { next_fire_at: DateTime<Utc> },
    /// The attempt failed and the retry budget is spent.
    Failed { reason: String },
}

/// Sends claimed jobs and records their outcome.
///
/// Mail failures are contained here: they become a retry or a terminal
/// failure, never an error returned to the worker loop.
pub struct Dispatcher {
    store: Arc<dyn ScheduleStore>,
    mailer: Arc<dyn MailTransport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    send_timeout: Duration,
    events: JobEvents,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mailer", &self.mailer.name())
            .field("policy", &self.policy)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        mailer: Arc<dyn MailTransport>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        send_timeout: Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            policy,
            send_timeout,
            events: JobEvents::new(),
        }
    }

    /// Publish lifecycle events on `events`.
    pub fn with_events(mut self, events: JobEvents) -> Self {
        self.events = events;
        self
    }

    /// Attempt delivery of a job already claimed as in flight.
    pub async fn dispatch(&self, job: &NotificationJob) -> DispatchOutcome {
        info!(
            job_id = %job.id,
            recipient = %job.recipient_email,
            attempt = job.attempt,
            max_attempts = job.max_attempts,
            "Dispatching reminder"
        );
        self.events.emit(JobEvent::Attempted {
            job_id: job.id,
            attempt: job.attempt,
        });

        match self.send(job).await {
            Ok(()) => self.record_delivered(job).await,
            Err(e) if job.has_attempts_left() => self.record_retry(job, e).await,
            Err(e) => self.record_failed(job, e).await,
        }
    }

    async fn send(&self, job: &NotificationJob) -> Result<(), MailError> {
        let message = render_reminder(&job.payload());
        match tokio::time::timeout(self.send_timeout, self.mailer.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(MailError::Timeout(self.send_timeout.as_secs())),
        }
    }

    async fn record_delivered(&self, job: &NotificationJob) -> DispatchOutcome {
        if let Err(e) = self.store.mark_terminal(job.id, JobOutcome::Delivered).await {
            error!(job_id = %job.id, error = %e, "Failed to record delivery");
        }

        info!(
            job_id = %job.id,
            recipient = %job.recipient_email,
            attempt = job.attempt,
            "Reminder delivered"
        );
        self.events.emit(JobEvent::Delivered {
            job_id: job.id,
            attempt: job.attempt,
        });
        DispatchOutcome::Delivered
    }

    async fn record_retry(&self, job: &NotificationJob, err: MailError) -> DispatchOutcome {
        let backoff = self.policy.backoff(job.attempt.max(1) as u32);
        let next_fire_at = self.clock.now()
            + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::zero());
        let reason = err.to_string();

        if let Err(e) = self.store.reenqueue(job.id, next_fire_at, &reason).await {
            error!(job_id = %job.id, error = %e, "Failed to re-queue reminder");
        }

        warn!(
            job_id = %job.id,
            recipient = %job.recipient_email,
            attempt = job.attempt,
            max_attempts = job.max_attempts,
            next_fire_at = %next_fire_at,
            error = %reason,
            "Reminder delivery failed, will retry"
        );
        self.events.emit(JobEvent::Retrying {
            job_id: job.id,
            attempt: job.attempt,
            next_fire_at,
            error: reason,
        });
        DispatchOutcome::Retrying { next_fire_at }
    }

    async fn record_failed(&self, job: &NotificationJob, err: MailError) -> DispatchOutcome {
        let reason = err.to_string();
        let outcome = JobOutcome::Failed {
            reason: reason.clone(),
        };
        if let Err(e) = self.store.mark_terminal(job.id, outcome).await {
            error!(job_id = %job.id, error = %e, "Failed to record permanent failure");
        }

        error!(
            job_id = %job.id,
            recipient = %job.recipient_email,
            attempt = job.attempt,
            error = %reason,
            "Reminder failed permanently"
        );
        self.events.emit(JobEvent::Failed {
            job_id: job.id,
            attempt: job.attempt,
            error: reason.clone(),
        });
        DispatchOutcome::Failed { reason }
    }
}
