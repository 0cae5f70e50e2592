use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::info;

use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::middleware::Operator;
use crate::infra::http::api::state::ApiState;

/// Drop every well-known cache key. Unlike reads, the operator is told when the
/// store cannot be reached.
pub async fn purge_cache(
    State(state): State<ApiState>,
    Operator(identity): Operator,
) -> Result<impl IntoResponse, ApiError> {
    state.invalidation.invalidate_all().await.map_err(|err| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CACHE_UNAVAILABLE,
            "Cache store unavailable",
            Some(err.to_string()),
        )
    })?;
    info!(
        target = "agora::http::cache",
        operator = %identity.subject,
        backend = state.cache_store.backend(),
        "cache purged"
    );
    Ok(StatusCode::NO_CONTENT)
}
