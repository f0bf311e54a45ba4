//! Mail transport commands.

use anyhow::Context;
use clap::{Args, Subcommand};

use reminder_core::config::AppConfig;
use reminder_entity::job::ReminderPayload;
use reminder_mail::{build_transport, render_reminder};

use crate::output;

/// Arguments for mail commands
#[derive(Debug, Args)]
pub struct MailArgs {
    /// Mail subcommand
    #[command(subcommand)]
    pub command: MailCommand,
}

/// Mail subcommands
#[derive(Debug, Subcommand)]
pub enum MailCommand {
    /// Send one sample reminder through the configured transport
    Test {
        /// Recipient address
        #[arg(long)]
        to: String,
    },
}

/// Execute mail commands
pub async fn execute(args: &MailArgs, config: &AppConfig) -> anyhow::Result<()> {
    match &args.command {
        MailCommand::Test { to } => {
            let transport =
                build_transport(&config.mail).context("Failed to build mail transport")?;
            let message = render_reminder(&ReminderPayload {
                recipient_email: to.clone(),
                event_name: "Test event".to_string(),
                lead_minutes: config.notify.default_lead_minutes,
            });

            println!("Sending test reminder via {}...", transport.name());
            transport
                .send(&message)
                .await
                .context("Failed to send test reminder")?;
            output::print_success(&format!("Test reminder sent to {to}"));
        }
    }

    Ok(())
}
