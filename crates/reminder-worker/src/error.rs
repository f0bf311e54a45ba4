//! Scheduling and store errors.

use thiserror::Error;

use reminder_core::error::{AppError, ErrorKind};
use reminder_core::types::JobId;

/// Why a reminder could not be scheduled.
///
/// A notify window that already elapsed is not an error; see
/// [`ScheduleOutcome::Skipped`](crate::ScheduleOutcome::Skipped).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Malformed event date or time.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// The schedule store could not be reached in time.
    #[error("schedule store unavailable: {0}")]
    StoreUnavailable(String),

    /// The recipient address is blank.
    #[error("invalid recipient: '{0}'")]
    InvalidRecipient(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        let kind = match err {
            ScheduleError::InvalidSchedule(_) | ScheduleError::InvalidRecipient(_) => {
                ErrorKind::Validation
            }
            ScheduleError::StoreUnavailable(_) => ErrorKind::ServiceUnavailable,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

/// Errors reported by a [`ScheduleStore`](crate::ScheduleStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store failed or is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No job with this id.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// The job is not in the state the operation requires.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<AppError> for StoreError {
    fn from(err: AppError) -> Self {
        Self::Unavailable(err.message)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let kind = match err {
            StoreError::Unavailable(_) => ErrorKind::ServiceUnavailable,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
