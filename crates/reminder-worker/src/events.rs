//! Job lifecycle notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use reminder_core::types::JobId;

/// Capacity of the lifecycle channel; slow subscribers miss older events.
const CHANNEL_CAPACITY: usize = 256;

/// Something that happened to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Enqueued {
        job_id: JobId,
        fire_at: DateTime<Utc>,
    },
    Attempted {
        job_id: JobId,
        attempt: i32,
    },
    Retrying {
        job_id: JobId,
        attempt: i32,
        next_fire_at: DateTime<Utc>,
        error: String,
    },
    Delivered {
        job_id: JobId,
        attempt: i32,
    },
    Failed {
        job_id: JobId,
        attempt: i32,
        error: String,
    },
    Cancelled {
        job_id: JobId,
    },
}

impl JobEvent {
    /// The job this event concerns.
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Enqueued { job_id, .. }
            | Self::Attempted { job_id, .. }
            | Self::Retrying { job_id, .. }
            | Self::Delivered { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Cancelled { job_id } => *job_id,
        }
    }
}

/// Broadcast sender for [`JobEvent`]s.
///
/// Emitting never blocks and never fails, with or without subscribers.
#[derive(Debug, Clone)]
pub struct JobEvents {
    tx: broadcast::Sender<JobEvent>,
}

impl JobEvents {
    /// Create a new channel.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Receive events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Publish an event.
    pub fn emit(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for JobEvents {
    fn default() -> Self {
        Self::new()
    }
}
