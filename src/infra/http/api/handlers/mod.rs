//! API handlers organized by resource type.
//!
//! Error conversions shared by the resource modules live here.

mod analytics;
mod cache;
mod events;
mod live;
mod locations;

pub use analytics::*;
pub use cache::*;
pub use events::*;
pub use live::*;
pub use locations::*;

use axum::http::StatusCode;

use crate::application::events::EventServiceError;
use crate::application::locations::LocationServiceError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation { field, message } => {
            ApiError::validation(format!("{field}: {message}"))
        }
    }
}

pub(crate) fn event_to_api(err: EventServiceError) -> ApiError {
    match err {
        EventServiceError::Validation(domain) => domain_to_api(domain),
        EventServiceError::NotFound => ApiError::not_found("event not found"),
        EventServiceError::UnknownLocation(id) => {
            ApiError::validation(format!("location_id: location `{id}` does not exist"))
        }
        EventServiceError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn location_to_api(err: LocationServiceError) -> ApiError {
    match err {
        LocationServiceError::Validation(domain) => domain_to_api(domain),
        LocationServiceError::NotFound => ApiError::not_found("location not found"),
        LocationServiceError::Repo(repo) => repo_to_api(repo),
    }
}
