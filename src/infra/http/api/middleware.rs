use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use tracing::debug;

use crate::application::auth::{AuthError, Identity};

use super::error::ApiError;
use super::state::ApiState;

/// An authenticated operator. Handlers that mutate state take this extractor.
#[derive(Debug, Clone)]
pub struct Operator(pub Identity);

impl FromRequestParts<ApiState> for Operator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers) else {
            return Err(ApiError::unauthorized());
        };

        match state.verifier.verify(&token).await {
            Ok(identity) => Ok(Self(identity)),
            Err(AuthError::Missing | AuthError::Rejected) => {
                debug!(
                    target = "agora::http::auth",
                    path = %parts.uri.path(),
                    "operator credential rejected"
                );
                Err(ApiError::unauthorized())
            }
        }
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|text| text.strip_prefix("Bearer "));
    if let Some(rest) = bearer {
        return Some(rest.trim().to_string());
    }

    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
}
