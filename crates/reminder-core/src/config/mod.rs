//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod mail;
pub mod notify;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::auth::AuthConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::mail::{MailConfig, MailTransportKind};
pub use self::notify::NotifyConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Prefix for environment variable overrides (`REMINDER__MAIL__PASSWORD`).
const ENV_PREFIX: &str = "REMINDER";

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration sources
/// (base file + environment overlay + environment variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Session token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Outbound mail settings.
    #[serde(default)]
    pub mail: MailConfig,
    /// Dispatcher worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Reminder scheduling and retry settings.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges the base file at `path`, an optional `config/{env}` overlay,
    /// and environment variables prefixed with `REMINDER__`.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.notify.validate()?;
        Ok(config)
    }

    /// Parse configuration from an inline TOML document (no overlays).
    pub fn from_toml(toml: &str) -> Result<Self, AppError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.notify.validate()?;
        Ok(config)
    }
}
