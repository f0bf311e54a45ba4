//! # reminder-api
//!
//! HTTP API layer for the event reminder service built on Axum.
//!
//! Provides the event endpoints, a liveness probe that reports queue
//! depth, session token extraction, and the mapping from [`AppError`]
//! to JSON error responses.
//!
//! [`AppError`]: reminder_core::error::AppError

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod session;
pub mod state;

pub use app::{bind, build_app, serve};
pub use error::ApiError;
pub use session::{SessionClaims, SessionVerifier};
pub use state::AppState;
