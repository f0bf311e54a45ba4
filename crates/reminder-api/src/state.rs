//! Application state shared across all handlers.

use std::sync::Arc;

use reminder_core::config::AuthConfig;
use reminder_service::EventService;
use reminder_worker::ScheduleStore;

use crate::session::SessionVerifier;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Event use cases
    pub event_service: Arc<EventService>,
    /// Reminder queue, read for health statistics
    pub schedule_store: Arc<dyn ScheduleStore>,
    /// Session token verifier
    pub sessions: Arc<SessionVerifier>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("event_service", &self.event_service)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates application state.
    pub fn new(
        event_service: Arc<EventService>,
        schedule_store: Arc<dyn ScheduleStore>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            event_service,
            schedule_store,
            sessions: Arc::new(SessionVerifier::new(auth)),
        }
    }
}
