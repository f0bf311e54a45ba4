//! Data transfer objects.
//!
//! Request bodies are the service's own types
//! ([`reminder_service::CreateEventRequest`]); this module holds responses.

pub mod response;

pub use response::{CreateEventResponse, DeleteResponse, HealthResponse, ReminderSummary};
