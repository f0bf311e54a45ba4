//! # reminder-service
//!
//! Application use cases around events. Creating an event with
//! notifications enabled schedules its reminder; deleting it cancels the
//! reminder.
//!
//! Services follow constructor injection; all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod event;

pub use context::Identity;
pub use event::{
    CreateEventRequest, CreatedEvent, EventService, EventStore, InMemoryEventStore, PgEventStore,
    ReminderStatus,
};
