//! Event record domain entities.

pub mod model;

pub use model::{CreateEvent, Event};
