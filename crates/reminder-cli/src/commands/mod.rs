//! CLI command definitions and dispatch.

pub mod jobs;
pub mod mail;
pub mod migrate;
pub mod schedule;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::PgPool;

use reminder_core::config::AppConfig;
use reminder_database::DatabasePool;
use reminder_database::repositories::JobRepository;
use reminder_worker::PgScheduleStore;

use crate::output::OutputFormat;

/// Event reminder queue administration
#[derive(Debug, Parser)]
#[command(name = "reminder-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Inspect and manage reminder jobs
    Jobs(jobs::JobsArgs),
    /// Schedule a one-off reminder
    Schedule(schedule::ScheduleArgs),
    /// Mail transport utilities
    Mail(mail::MailArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> anyhow::Result<()> {
        let config = load_config(&self.config)?;
        match &self.command {
            Commands::Migrate => migrate::execute(&config).await,
            Commands::Jobs(args) => jobs::execute(args, &config, self.format).await,
            Commands::Schedule(args) => schedule::execute(args, &config, self.format).await,
            Commands::Mail(args) => mail::execute(args, &config).await,
        }
    }
}

/// Load configuration for the environment named by `REMINDER_ENV`.
pub fn load_config(config_path: &str) -> anyhow::Result<AppConfig> {
    let env = std::env::var("REMINDER_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(config_path, &env)
        .with_context(|| format!("Failed to load config from {config_path}"))
}

/// Connect to the configured database.
pub async fn create_db_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = DatabasePool::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    Ok(pool.into_pool())
}

/// The reminder queue backed by the configured database.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<PgScheduleStore>> {
    let pool = create_db_pool(config).await?;
    Ok(Arc::new(PgScheduleStore::new(Arc::new(JobRepository::new(
        pool,
    )))))
}
