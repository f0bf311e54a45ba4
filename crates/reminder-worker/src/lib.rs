//! # reminder-worker
//!
//! Delayed email reminders: computing when a reminder fires, persisting it
//! in a [`ScheduleStore`], and dispatching due jobs through a mail transport
//! with bounded retries.

pub mod backoff;
pub mod clock;
pub mod delay;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod maintenance;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use backoff::RetryPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use delay::{Delay, compute_delay, compute_delay_str, parse_event_date, parse_event_time};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{ScheduleError, StoreError};
pub use events::{JobEvent, JobEvents};
pub use maintenance::{MaintenanceScheduler, MaintenanceTasks};
pub use runner::WorkerRunner;
pub use scheduler::{JobHandle, ReminderScheduler, ScheduleOutcome, ScheduleRequest};
pub use store::{InMemoryScheduleStore, PgScheduleStore, QueueStats, ScheduleStore};
