//! Transport that writes messages to the log instead of sending them.

use async_trait::async_trait;
use tracing::info;

use crate::error::MailError;
use crate::message::MailMessage;
use crate::transport::MailTransport;

/// Development transport: every send succeeds and is logged.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl LogMailer {
    /// Create a new log mailer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Mail (log transport)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
