//! Reminder job inspection and maintenance commands.

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use reminder_core::config::AppConfig;
use reminder_core::types::JobId;
use reminder_entity::job::{JobState, NotificationJob};
use reminder_worker::{MaintenanceTasks, ScheduleStore, SystemClock};

use crate::output::{self, OutputFormat};

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobsArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobsCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List jobs by fire time
    List {
        /// Only jobs in this state (pending, in_flight, delivered, failed, cancelled)
        #[arg(long)]
        state: Option<String>,
        /// Maximum number of rows
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Job counts per state
    Stats,
    /// Show one job in full
    Show {
        /// Job ID
        id: String,
    },
    /// Cancel a pending job
    Cancel {
        /// Job ID
        id: String,
    },
    /// Delete finished jobs
    Purge {
        /// Only jobs finished more than this many days ago
        #[arg(long, default_value_t = 30)]
        older_than_days: u32,
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Return jobs abandoned by a dead worker to the queue
    RequeueStale,
}

/// Job display row
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    /// Job ID
    id: String,
    /// State
    state: String,
    /// Recipient
    recipient: String,
    /// Event
    event: String,
    /// Fire at
    fire_at: String,
    /// Attempts
    attempts: String,
    /// Last error
    last_error: String,
}

impl From<&NotificationJob> for JobRow {
    fn from(job: &NotificationJob) -> Self {
        Self {
            id: job.id.to_string(),
            state: job.state.to_string(),
            recipient: job.recipient_email.clone(),
            event: job.event_name.clone(),
            fire_at: job.fire_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            attempts: format!("{}/{}", job.attempt, job.max_attempts),
            last_error: job.last_error.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Per-state count row
#[derive(Debug, Serialize, Tabled)]
struct StatRow {
    /// State
    state: String,
    /// Jobs
    count: u64,
}

/// Execute job commands
pub async fn execute(
    args: &JobsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;

    match &args.command {
        JobsCommand::List { state, limit } => {
            let state = state
                .as_deref()
                .map(str::parse::<JobState>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let jobs = store
                .list(state, *limit)
                .await
                .context("Failed to list jobs")?;
            let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
            output::print_list(&rows, format);
        }
        JobsCommand::Stats => {
            let stats = store.stats().await.context("Failed to read job stats")?;
            match format {
                OutputFormat::Json => output::print_record(&stats, format),
                OutputFormat::Table => {
                    let rows = vec![
                        StatRow { state: JobState::Pending.to_string(), count: stats.pending },
                        StatRow { state: JobState::InFlight.to_string(), count: stats.in_flight },
                        StatRow { state: JobState::Delivered.to_string(), count: stats.delivered },
                        StatRow { state: JobState::Failed.to_string(), count: stats.failed },
                        StatRow { state: JobState::Cancelled.to_string(), count: stats.cancelled },
                        StatRow { state: "total".to_string(), count: stats.total() },
                    ];
                    output::print_list(&rows, format);
                }
            }
        }
        JobsCommand::Show { id } => {
            let job_id = parse_job_id(id)?;
            match store.get(job_id).await.context("Failed to load job")? {
                Some(job) => output::print_record(&job, format),
                None => bail!("Job {job_id} not found"),
            }
        }
        JobsCommand::Cancel { id } => {
            let job_id = parse_job_id(id)?;
            if store.cancel(job_id).await.context("Failed to cancel job")? {
                output::print_success(&format!("Job {job_id} cancelled"));
            } else {
                output::print_warning(&format!(
                    "Job {job_id} is not pending; nothing to cancel"
                ));
            }
        }
        JobsCommand::Purge {
            older_than_days,
            yes,
        } => {
            if !yes {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete finished jobs older than {older_than_days} days?"
                    ))
                    .default(false)
                    .interact()
                    .context("Input error")?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let purged = maintenance(store, config)
                .purge_older_than(chrono::Duration::days(i64::from(*older_than_days)))
                .await
                .context("Failed to purge jobs")?;
            output::print_success(&format!("Purged {purged} jobs"));
        }
        JobsCommand::RequeueStale => {
            let recovered = maintenance(store, config)
                .requeue_stale()
                .await
                .context("Failed to recover stale jobs")?;
            output::print_success(&format!("Recovered {recovered} stale jobs"));
        }
    }

    Ok(())
}

fn maintenance(store: Arc<dyn ScheduleStore>, config: &AppConfig) -> MaintenanceTasks {
    MaintenanceTasks::new(store, Arc::new(SystemClock), &config.notify)
}

fn parse_job_id(raw: &str) -> anyhow::Result<JobId> {
    raw.parse::<JobId>()
        .map_err(|e| anyhow::anyhow!("Invalid job id '{raw}': {e}"))
}
