//! Event handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use reminder_core::types::EventId;
use reminder_entity::event::Event;
use reminder_service::CreateEventRequest;

use crate::dto::{CreateEventResponse, DeleteResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, JsonBody};
use crate::state::AppState;

/// GET /api/events
pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.event_service.list_events(&auth).await?;
    Ok(Json(events))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(req): JsonBody<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreateEventResponse>), ApiError> {
    let created = state.event_service.create_event(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// DELETE /api/events/{id}
pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .event_service
        .delete_event(&auth, EventId::from_uuid(id))
        .await?;
    Ok(Json(DeleteResponse { success: true }))
}
