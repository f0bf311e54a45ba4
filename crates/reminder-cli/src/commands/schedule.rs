//! Manual reminder scheduling.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use reminder_core::config::AppConfig;
use reminder_core::types::JobId;
use reminder_worker::{ReminderScheduler, ScheduleOutcome, ScheduleRequest, SystemClock};

use crate::output::{self, OutputFormat};

/// Arguments for the schedule command
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Recipient address
    #[arg(long)]
    pub to: String,
    /// Event name shown in the reminder
    #[arg(long)]
    pub name: String,
    /// Event date, `YYYY-MM-DD`
    #[arg(long)]
    pub date: String,
    /// Event start, `HH:MM` in the server's local time
    #[arg(long)]
    pub time: String,
    /// Minutes before the start; defaults to `notify.default_lead_minutes`
    #[arg(long)]
    pub lead: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Scheduled {
    job_id: JobId,
    fire_at: DateTime<Utc>,
}

/// Execute the schedule command
pub async fn execute(
    args: &ScheduleArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let scheduler = ReminderScheduler::new(store, Arc::new(SystemClock), config.notify.clone());

    let lead_minutes = args
        .lead
        .filter(|lead| *lead > 0)
        .unwrap_or(config.notify.default_lead_minutes);

    let outcome = scheduler
        .schedule(ScheduleRequest {
            recipient_email: args.to.clone(),
            event_name: args.name.clone(),
            lead_minutes,
            event_date: args.date.clone(),
            event_time: args.time.clone(),
            event_id: None,
        })
        .await
        .context("Failed to schedule reminder")?;

    match outcome {
        ScheduleOutcome::Scheduled(handle) => {
            output::print_success("Reminder scheduled");
            output::print_record(
                &Scheduled {
                    job_id: handle.job_id,
                    fire_at: handle.fire_at,
                },
                format,
            );
        }
        ScheduleOutcome::Skipped => {
            output::print_warning("Notification time already passed; nothing scheduled");
        }
    }

    Ok(())
}
