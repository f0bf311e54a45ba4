//! Job lifecycle state and terminal outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a notification job.
///
/// `Pending → InFlight → {Delivered | Failed}`; a failed attempt with budget
/// left moves `InFlight → Pending` again. `Cancelled` is reachable only from
/// `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reminder_job_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for its fire time.
    Pending,
    /// Claimed by a worker; a delivery attempt is running.
    InFlight,
    /// The reminder was sent.
    Delivered,
    /// The retry budget was exhausted.
    Failed,
    /// Removed from scheduling before it fired.
    Cancelled,
}

impl JobState {
    /// Terminal jobs are immutable and never scheduled again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Cancelled)
    }

    /// Return the state as its stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// All states, in lifecycle order.
    pub fn all() -> [JobState; 5] {
        [
            Self::Pending,
            Self::InFlight,
            Self::Delivered,
            Self::Failed,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown job state '{s}'"))
    }
}

/// How a job left the `InFlight` state for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The mail transport accepted the reminder.
    Delivered,
    /// Every attempt failed; `reason` is the last transport error.
    Failed {
        /// Last delivery error.
        reason: String,
    },
}

impl JobOutcome {
    /// The terminal state this outcome records.
    pub fn state(&self) -> JobState {
        match self {
            Self::Delivered => JobState::Delivered,
            Self::Failed { .. } => JobState::Failed,
        }
    }

    /// Error text stored alongside a failed job.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Delivered => None,
            Self::Failed { reason } => Some(reason),
        }
    }
}
