//! Background dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Dispatcher worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether this process runs dispatcher workers.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of reminders dispatched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Upper bound in seconds on how long an idle worker sleeps between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Whether the maintenance cron (stale recovery, purge) runs here.
    #[serde(default = "default_true")]
    pub maintenance: bool,
    /// Prefix of the worker id recorded on claimed jobs (`{prefix}-{pid}-{n}`).
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            maintenance: true,
            id_prefix: default_id_prefix(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_id_prefix() -> String {
    "reminder-worker".to_string()
}
