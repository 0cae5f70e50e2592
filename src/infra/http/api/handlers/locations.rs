//! Locations handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use super::location_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::Operator;
use crate::infra::http::api::models::{ApiJson, CreateLocationRequest, UpdateLocationRequest};
use crate::infra::http::api::state::ApiState;

pub async fn list_locations(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let locations = state.locations.list().await.map_err(location_to_api)?;
    Ok(Json(locations))
}

pub async fn create_location(
    State(state): State<ApiState>,
    _operator: Operator,
    ApiJson(payload): ApiJson<CreateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .locations
        .create(payload.into())
        .await
        .map_err(location_to_api)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_location(
    State(state): State<ApiState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .locations
        .update(id, payload.into())
        .await
        .map_err(location_to_api)?;
    Ok(Json(record))
}

pub async fn delete_location(
    State(state): State<ApiState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.locations.delete(id).await.map_err(location_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
