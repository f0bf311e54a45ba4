//! Log output settings for the server and worker processes.

use serde::{Deserialize, Serialize};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human output for local runs.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_filter(),
            format: LogFormat::default(),
        }
    }
}

fn default_filter() -> String {
    "info,reminder_worker=debug".to_string()
}
