//! Database migration command.

use anyhow::Context;

use reminder_core::config::AppConfig;

use crate::output;

/// Run all pending migrations
pub async fn execute(config: &AppConfig) -> anyhow::Result<()> {
    let pool = super::create_db_pool(config).await?;

    println!("Running database migrations...");
    reminder_database::migration::run_migrations(&pool)
        .await
        .context("Migration failed")?;
    output::print_success("All migrations applied successfully.");

    Ok(())
}
