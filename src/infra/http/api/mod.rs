pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{get, patch, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/v1/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route(
            "/api/v1/events/{id}",
            patch(handlers::update_event).delete(handlers::delete_event),
        )
        .route(
            "/api/v1/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route(
            "/api/v1/locations/{id}",
            patch(handlers::update_location).delete(handlers::delete_location),
        )
        .route(
            "/api/v1/analytics/summary",
            get(handlers::analytics_summary),
        )
        .route("/api/v1/live", get(handlers::live_stream))
        .route("/api/v1/cache/purge", post(handlers::purge_cache))
        .with_state(state)
}
