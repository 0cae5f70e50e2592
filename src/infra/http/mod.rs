pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Router, middleware as axum_middleware, routing::get};
use tracing::debug;

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use middleware::{log_responses, set_request_context};

pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// Full application router: the JSON API, the live stream and the health probe.
pub fn build_router(state: ApiState) -> Router {
    let health = Router::new()
        .route("/healthz", get(health_check))
        .with_state(state.clone());

    build_api_router(state)
        .merge(health)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health_check(State(state): State<ApiState>) -> Response {
    let cache_status = match state.cache_store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            debug!(
                target = "agora::http::health",
                backend = state.cache_store.backend(),
                error = %err,
                "cache ping failed"
            );
            "unavailable"
        }
    };

    let mut response = db_health_response(state.health.health_check().await);
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status));
    response
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
