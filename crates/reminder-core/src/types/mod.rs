//! Shared domain types.

pub mod id;

pub use id::{EventId, JobId, UserId};
