use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use super::repo_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn analytics_summary(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.analytics.summary().await.map_err(repo_to_api)?;
    Ok(Json(summary))
}
