//! The error type shared by every reminder crate.
//!
//! Crate-local errors (`StoreError`, `MailError`, ...) convert into
//! [`AppError`] where they leave their crate. The API layer maps the
//! [`ErrorKind`] onto an HTTP status.

use std::fmt;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What went wrong, coarse enough to pick a status code from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    NotFound,
    /// Missing, malformed, or expired session token.
    Unauthorized,
    Validation,
    /// A job or event row changed under us.
    Conflict,
    Internal,
    Database,
    Configuration,
    Serialization,
    /// The SMTP relay rejected or dropped a message.
    ExternalService,
    /// The schedule store or database cannot be reached right now.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Upper snake case label used in logs and error bodies.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error with a kind, a message safe to show callers, and an optional
/// cause kept for logs.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

macro_rules! kind_constructors {
    ($($fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            pub fn $fn_name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Like [`AppError::new`], keeping `source` as the cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(kind, message)
        }
    }

    kind_constructors! {
        not_found => NotFound,
        unauthorized => Unauthorized,
        validation => Validation,
        conflict => Conflict,
        internal => Internal,
        database => Database,
        configuration => Configuration,
        service_unavailable => ServiceUnavailable,
    }
}

/// Clones keep kind and message; the cause is not cloneable and is dropped.
impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let message = format!("Malformed JSON: {err}");
        Self::with_source(ErrorKind::Serialization, message, err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        let message = format!("Could not load settings: {err}");
        Self::with_source(ErrorKind::Configuration, message, err)
    }
}
