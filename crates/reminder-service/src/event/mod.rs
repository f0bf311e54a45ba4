//! Event records and their reminders.

pub mod request;
pub mod service;
pub mod store;

pub use request::CreateEventRequest;
pub use service::{CreatedEvent, EventService, ReminderStatus};
pub use store::{EventStore, InMemoryEventStore, PgEventStore};
