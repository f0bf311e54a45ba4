//! # reminder-database
//!
//! PostgreSQL connection management and the repositories backing the
//! durable schedule store and the event records.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
