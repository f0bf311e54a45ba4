//! Route definitions for the reminder HTTP API.
//!
//! All routes are mounted under `/api`.

use axum::{
    Router,
    routing::{delete, get},
};

use crate::handlers;
use crate::state::AppState;

/// Build the API router and thread `AppState` through every route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(event_routes())
        .merge(health_routes());

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Event endpoints
fn event_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/events",
            get(handlers::event::list_events).post(handlers::event::create_event),
        )
        .route("/events/{id}", delete(handlers::event::delete_event))
}

/// Health
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
