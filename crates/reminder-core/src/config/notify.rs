//! Reminder scheduling and retry configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Longest accepted stale-claim window: one year.
const MAX_STALE_AFTER_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Settings that govern how reminders are scheduled and retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Delivery attempts before a reminder is marked permanently failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Lead minutes used when an event asks for a reminder without one.
    #[serde(default = "default_lead_minutes")]
    pub default_lead_minutes: u32,
    /// First retry delay in seconds; `0` re-queues immediately.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: u64,
    /// Cap on the retry delay in seconds.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_seconds: u64,
    /// Bound on a single enqueue call, in milliseconds.
    #[serde(default = "default_enqueue_timeout")]
    pub enqueue_timeout_ms: u64,
    /// Bound on a single mail send, in seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    /// In-flight jobs older than this are treated as abandoned by a dead worker.
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
    /// Terminal jobs are purged after this many days.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl NotifyConfig {
    /// Reject values the worker cannot turn into row fields or durations.
    pub fn validate(&self) -> Result<(), AppError> {
        if i32::try_from(self.max_attempts).is_err() {
            return Err(AppError::configuration(format!(
                "notify.max_attempts {} is too large",
                self.max_attempts
            )));
        }
        if i32::try_from(self.default_lead_minutes).is_err() {
            return Err(AppError::configuration(format!(
                "notify.default_lead_minutes {} is too large",
                self.default_lead_minutes
            )));
        }
        if !(1..=MAX_STALE_AFTER_SECONDS).contains(&self.stale_after_seconds) {
            return Err(AppError::configuration(format!(
                "notify.stale_after_seconds must be between 1 and {MAX_STALE_AFTER_SECONDS}, got {}",
                self.stale_after_seconds
            )));
        }
        Ok(())
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            default_lead_minutes: default_lead_minutes(),
            backoff_base_seconds: default_backoff_base(),
            backoff_max_seconds: default_backoff_max(),
            enqueue_timeout_ms: default_enqueue_timeout(),
            send_timeout_seconds: default_send_timeout(),
            stale_after_seconds: default_stale_after(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lead_minutes() -> u32 {
    30
}

fn default_backoff_base() -> u64 {
    30
}

fn default_backoff_max() -> u64 {
    600
}

fn default_enqueue_timeout() -> u64 {
    3000
}

fn default_send_timeout() -> u64 {
    60
}

fn default_stale_after() -> u64 {
    600
}

fn default_retention_days() -> u32 {
    30
}
