//! PostgreSQL connection pool for the reminder queue and event records.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, warn};

use reminder_core::config::DatabaseConfig;
use reminder_core::error::{AppError, ErrorKind};

/// Connection attempts made before startup gives up.
const CONNECT_ATTEMPTS: u32 = 5;

/// Owned handle to the shared pool.
///
/// Opened once at process start, cloned into repositories, closed on
/// shutdown.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open the pool, retrying with a doubling delay while the server is
    /// not yet reachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = PgConnectOptions::from_str(&config.url).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid database url", e)
        })?;
        let target = describe(&options);

        let mut delay = Duration::from_millis(500);
        let mut attempt = 1;
        loop {
            info!(
                target_db = %target,
                attempt,
                max_connections = config.max_connections,
                "Connecting to PostgreSQL"
            );

            match pool_options(config).connect_with(options.clone()).await {
                Ok(pool) => {
                    info!(target_db = %target, "PostgreSQL pool ready");
                    return Ok(Self { pool });
                }
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!(
                        target_db = %target,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "PostgreSQL not reachable yet"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::ServiceUnavailable,
                        format!("Database {target} unreachable after {attempt} attempts"),
                        e,
                    ));
                }
            }
        }
    }

    /// Borrow the sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Take the sqlx pool out of the handle.
    pub fn into_pool(self) -> PgPool {
        self.pool
    }

    /// Close every connection; pending queries finish first.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

/// `user@host:port/database`, without the password.
fn describe(options: &PgConnectOptions) -> String {
    format!(
        "{}@{}:{}/{}",
        options.get_username(),
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or("-"),
    )
}
