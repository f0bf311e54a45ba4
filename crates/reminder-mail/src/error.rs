//! Mail delivery errors.

use thiserror::Error;

use reminder_core::error::{AppError, ErrorKind};

/// Why a message could not be delivered.
#[derive(Debug, Error)]
pub enum MailError {
    /// Sender or recipient is not a valid mailbox.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The relay refused the message or could not be reached.
    #[error("SMTP error: {0}")]
    Transport(String),

    /// The send did not complete in time.
    #[error("send timed out after {0}s")]
    Timeout(u64),
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        let kind = match err {
            MailError::InvalidAddress(_) => ErrorKind::Validation,
            MailError::Build(_) => ErrorKind::Internal,
            MailError::Transport(_) | MailError::Timeout(_) => ErrorKind::ExternalService,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
