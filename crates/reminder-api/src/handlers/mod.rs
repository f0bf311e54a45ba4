//! HTTP handlers.

pub mod event;
pub mod health;
