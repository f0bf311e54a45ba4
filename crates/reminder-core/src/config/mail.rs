//! Outbound mail configuration.

use serde::{Deserialize, Serialize};

/// Which mail transport delivers reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportKind {
    /// Deliver through an SMTP relay.
    #[default]
    Smtp,
    /// Log messages instead of sending them (development).
    Log,
}

/// SMTP relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Transport used for delivery.
    #[serde(default)]
    pub transport: MailTransportKind,
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Use STARTTLS (`true`) or implicit TLS (`false`).
    #[serde(default = "default_true")]
    pub starttls: bool,
    /// SMTP username (also the default sender address).
    #[serde(default)]
    pub username: String,
    /// SMTP password.
    #[serde(default)]
    pub password: String,
    /// Sender address; falls back to `username` when empty.
    #[serde(default)]
    pub from_address: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Upper bound for a single SMTP exchange, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl MailConfig {
    /// The address reminders are sent from.
    pub fn sender_address(&self) -> &str {
        if self.from_address.is_empty() {
            &self.username
        } else {
            &self.from_address
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransportKind::default(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            starttls: true,
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
            from_name: default_from_name(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_from_name() -> String {
    "Event Reminder".to_string()
}

fn default_timeout() -> u64 {
    30
}
