//! Notification job domain entities.

pub mod model;
pub mod status;

pub use model::{CreateJob, NotificationJob, ReminderPayload};
pub use status::{JobOutcome, JobState};
