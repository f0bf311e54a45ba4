//! Schema migrations embedded from the workspace `migrations/` directory.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use reminder_core::error::{AppError, ErrorKind};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the events and reminder job tables up to the latest schema.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or_default();
    info!(known = MIGRATOR.iter().count(), latest, "Applying schema migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Schema migration failed: {e}"), e)
    })?;

    info!(latest, "Schema is up to date");
    Ok(())
}
