//! Persistence seam for event records.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use reminder_core::error::AppError;
use reminder_core::result::AppResult;
use reminder_core::types::{EventId, UserId};
use reminder_database::repositories::EventRepository;
use reminder_entity::event::{CreateEvent, Event};

/// Storage for event records.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Persist a new event.
    async fn insert(&self, event: CreateEvent) -> AppResult<Event>;

    /// Find an event by ID.
    async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>>;

    /// A user's events ordered by date, then time.
    async fn list_by_user(&self, user_id: UserId) -> AppResult<Vec<Event>>;

    /// Delete an event. Returns `false` if it did not exist.
    async fn delete(&self, id: EventId) -> AppResult<bool>;
}

/// [`EventStore`] over the `events` table.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    repo: Arc<EventRepository>,
}

impl PgEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(repo: Arc<EventRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, event: CreateEvent) -> AppResult<Event> {
        self.repo.create(&event).await
    }

    async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>> {
        self.repo.find_by_id(id).await
    }

    async fn list_by_user(&self, user_id: UserId) -> AppResult<Vec<Event>> {
        self.repo.find_by_user(user_id).await
    }

    async fn delete(&self, id: EventId) -> AppResult<bool> {
        self.repo.delete(id).await
    }
}

/// In-process [`EventStore`] for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<HashMap<EventId, Event>>,
    offline: AtomicBool,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with a database error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AppError::database("in-memory event store is offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: CreateEvent) -> AppResult<Event> {
        self.check_online()?;
        let mut events = self.events.lock().await;
        if events.contains_key(&event.id) {
            return Err(AppError::conflict(format!("Event {} already exists", event.id)));
        }
        let event = event.into_event(Utc::now());
        events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>> {
        self.check_online()?;
        Ok(self.events.lock().await.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> AppResult<Vec<Event>> {
        self.check_online()?;
        let events = self.events.lock().await;
        let mut owned: Vec<Event> = events
            .values()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|event| (event.event_date, event.event_time));
        Ok(owned)
    }

    async fn delete(&self, id: EventId) -> AppResult<bool> {
        self.check_online()?;
        Ok(self.events.lock().await.remove(&id).is_some())
    }
}
