use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;

use crate::errors::{ApiError, EventError};
use crate::models::Actor;
use crate::services::event_service::{EnableOutcome, EventChanges, EventDraft, EventService};

#[derive(Clone)]
pub struct EventState {
    pub event_service: Arc<EventService>,
}

/// Caller identity arrives pre-authenticated from the gateway as headers;
/// authentication itself lives outside this service.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, EventError> {
    let header_id = |name: &str| -> Result<Option<i32>, EventError> {
        headers
            .get(name)
            .map(|value| {
                value
                    .to_str()
                    .ok()
                    .and_then(|raw| raw.parse::<i32>().ok())
                    .ok_or(EventError::InvalidActor)
            })
            .transpose()
    };

    let role = headers
        .get("x-actor-role")
        .and_then(|value| value.to_str().ok())
        .ok_or(EventError::InvalidActor)?;
    let tenant_id = header_id("x-tenant-id")?.ok_or(EventError::InvalidActor)?;

    match role {
        "tenant" => Ok(Actor::Tenant { id: tenant_id }),
        "sub_tenant" => {
            let id = header_id("x-sub-tenant-id")?.ok_or(EventError::InvalidActor)?;
            Ok(Actor::SubTenant { id, tenant_id })
        }
        _ => Err(EventError::InvalidActor),
    }
}

pub async fn create_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    Json(draft): Json<EventDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let event = state.event_service.create_event(actor, draft).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_events_by_device(
    State(state): State<EventState>,
    Path(device_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.event_service.events().find_by_device(device_id).await?;

    Ok(Json(events))
}

pub async fn start_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    Path(event_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let event = state.event_service.start_event(actor, event_id).await?;

    Ok(Json(event))
}

pub async fn stop_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    Path(event_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let event = state.event_service.stop_event(actor, event_id).await?;

    Ok(Json(event))
}

pub async fn disable_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    Path(event_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let event = state.event_service.disable_event(actor, event_id).await?;

    Ok(Json(event))
}

pub async fn enable_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    Path(event_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;

    match state.event_service.enable_event(actor, event_id).await? {
        EnableOutcome::Enabled(event) => Ok(Json(json!({ "enabled": true, "event": event }))),
        EnableOutcome::Expired => Ok(Json(json!({
            "enabled": false,
            "reason": "event window already closed"
        }))),
    }
}

pub async fn update_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    Path(event_id): Path<i32>,
    Json(changes): Json<EventChanges>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let event = state
        .event_service
        .update_event(actor, event_id, changes)
        .await?;

    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    Path(event_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state.event_service.delete_event(actor, event_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
