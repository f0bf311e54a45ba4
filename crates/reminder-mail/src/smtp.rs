//! SMTP delivery over lettre's async transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use reminder_core::config::MailConfig;

use crate::error::MailError;
use crate::message::MailMessage;
use crate::transport::MailTransport;

/// Sends mail through an SMTP relay.
///
/// The connection pool inside lettre's transport is built once and reused
/// for every send.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Build a mailer from configuration.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let address: Address = config
            .sender_address()
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("from: {e}")))?;
        let from = Mailbox::new(Some(config.from_name.clone()), address);

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| MailError::Transport(format!("SMTP relay: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: &MailMessage) -> Result<Message, MailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("to: {e}")))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone());

        match &message.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                html.clone(),
            )),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(message.text.clone()),
        }
        .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let email = self.build_message(message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        debug!(to = %message.to, "SMTP relay accepted message");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 2525,
            starttls: false,
            username: "reminders@example.com".into(),
            ..MailConfig::default()
        }
    }

    #[tokio::test]
    async fn test_sender_uses_display_name() {
        let mailer = SmtpMailer::from_config(&config()).unwrap();
        let from = mailer.from.to_string();
        assert!(from.contains("Event Reminder"));
        assert!(from.ends_with("<reminders@example.com>"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected_before_sending() {
        let mailer = SmtpMailer::from_config(&config()).unwrap();
        let message = MailMessage::text("not an address", "Hi", "Body");
        assert!(matches!(
            mailer.build_message(&message),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_html_message_builds_multipart() {
        let mailer = SmtpMailer::from_config(&config()).unwrap();
        let message = MailMessage::text("ada@example.com", "Hi", "Body").with_html("<p>Body</p>");
        let built = mailer.build_message(&message).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
    }
}
