//! Events handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use super::event_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::Operator;
use crate::infra::http::api::models::{ApiJson, CreateEventRequest, UpdateEventRequest};
use crate::infra::http::api::state::ApiState;

pub async fn list_events(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let events = state.events.list().await.map_err(event_to_api)?;
    Ok(Json(events))
}

pub async fn create_event(
    State(state): State<ApiState>,
    _operator: Operator,
    ApiJson(payload): ApiJson<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .events
        .create(payload.into())
        .await
        .map_err(event_to_api)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_event(
    State(state): State<ApiState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .events
        .update(id, payload.into())
        .await
        .map_err(event_to_api)?;
    Ok(Json(record))
}

pub async fn delete_event(
    State(state): State<ApiState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.events.delete(id).await.map_err(event_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
