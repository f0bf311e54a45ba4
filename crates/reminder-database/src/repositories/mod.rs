//! Concrete repositories.

pub mod event;
pub mod job;

pub use event::EventRepository;
pub use job::JobRepository;
