//! # reminder-entity
//!
//! Domain entities persisted by the reminder service: scheduled
//! notification jobs and the event records they remind about.

pub mod event;
pub mod job;
