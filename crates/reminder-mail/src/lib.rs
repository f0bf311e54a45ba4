//! # reminder-mail
//!
//! The outbound mail collaborator: a [`MailTransport`] trait with an SMTP
//! implementation (lettre) and a logging implementation for development,
//! plus the reminder message template.

pub mod error;
pub mod log_mailer;
pub mod message;
pub mod smtp;
pub mod template;
pub mod transport;

pub use error::MailError;
pub use log_mailer::LogMailer;
pub use message::MailMessage;
pub use smtp::SmtpMailer;
pub use template::render_reminder;
pub use transport::{MailTransport, build_transport};
