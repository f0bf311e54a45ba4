//! Retry budget and backoff between delivery attempts.

use std::time::Duration;

use reminder_core::config::NotifyConfig;

/// How many times a reminder is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per job, including the first.
    pub max_attempts: u32,
    /// Wait after the first failure. Zero re-queues immediately.
    pub base: Duration,
    /// Upper bound on any single wait.
    pub max: Duration,
}

impl RetryPolicy {
    /// Build the policy from the notify section.
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base: Duration::from_secs(config.backoff_base_seconds),
            max: Duration::from_secs(config.backoff_max_seconds),
        }
    }

    /// Wait before the attempt after failed attempt number `attempt`.
    ///
    /// `base * 2^(attempt - 1)`, capped at `max`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NotifyConfig::default())
    }
}
