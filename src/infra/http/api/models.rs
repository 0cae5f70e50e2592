//! Request bodies and the JSON extractor used by the API.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use time::Date;
use uuid::Uuid;

use crate::application::events::{CreateEventCommand, UpdateEventCommand};
use crate::application::locations::{CreateLocationCommand, UpdateLocationCommand};
use crate::domain::types::calendar_date;

use super::error::{ApiError, codes};

/// `Json` whose rejections use the API error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                rejection.status(),
                codes::INVALID_INPUT,
                "Malformed request body",
                Some(rejection.body_text()),
            )),
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(with = "calendar_date")]
    pub date: Date,
    #[serde(default)]
    pub location_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateEventRequest> for CreateEventCommand {
    fn from(request: CreateEventRequest) -> Self {
        Self {
            title: request.title,
            date: request.date,
            location_id: request.location_id,
            description: request.description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "calendar_date::option::deserialize")]
    pub date: Option<Date>,
    #[serde(default, deserialize_with = "double_option")]
    pub location_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl From<UpdateEventRequest> for UpdateEventCommand {
    fn from(request: UpdateEventRequest) -> Self {
        Self {
            title: request.title,
            date: request.date,
            location_id: request.location_id,
            description: request.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl From<CreateLocationRequest> for CreateLocationCommand {
    fn from(request: CreateLocationRequest) -> Self {
        Self {
            name: request.name,
            address: request.address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLocationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
}

impl From<UpdateLocationRequest> for UpdateLocationCommand {
    fn from(request: UpdateLocationRequest) -> Self {
        Self {
            name: request.name,
            address: request.address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let cleared: UpdateEventRequest =
            serde_json::from_str(r#"{"location_id": null}"#).expect("parse");
        assert_eq!(cleared.location_id, Some(None));
        assert_eq!(cleared.description, None);

        let untouched: UpdateEventRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(untouched.location_id, None);
    }

    #[test]
    fn event_dates_must_be_iso() {
        let ok: Result<CreateEventRequest, _> =
            serde_json::from_str(r#"{"title":"Feria","date":"2025-01-20"}"#);
        assert!(ok.is_ok());

        let bad: Result<CreateEventRequest, _> =
            serde_json::from_str(r#"{"title":"Feria","date":"Jan 20"}"#);
        assert!(bad.is_err());
    }
}
