//! The mail transport seam.

use std::sync::Arc;

use async_trait::async_trait;

use reminder_core::config::{MailConfig, MailTransportKind};

use crate::error::MailError;
use crate::log_mailer::LogMailer;
use crate::message::MailMessage;
use crate::smtp::SmtpMailer;

/// Something that attempts delivery of one message.
///
/// Implementations report failure through [`MailError`]; they never panic on
/// a refused or unreachable relay.
#[async_trait]
pub trait MailTransport: Send + Sync + 'static {
    /// Attempt delivery of `message`.
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Build the transport selected by `config.transport`.
pub fn build_transport(config: &MailConfig) -> Result<Arc<dyn MailTransport>, MailError> {
    match config.transport {
        MailTransportKind::Smtp => Ok(Arc::new(SmtpMailer::from_config(config)?)),
        MailTransportKind::Log => Ok(Arc::new(LogMailer::new())),
    }
}
