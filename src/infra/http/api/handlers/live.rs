//! Server-Sent Events stream of change notifications.

use std::convert::Infallible;

use async_stream::stream;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde_json::json;
use tracing::{debug, warn};

use crate::infra::http::api::state::ApiState;
use crate::realtime::SessionMessage;

pub async fn live_stream(State(state): State<ApiState>) -> impl IntoResponse {
    let mut session = state.sessions.register();
    let session_id = session.id();
    debug!(
        target = "agora::http::live",
        session_id = %session_id,
        sessions = state.sessions.len(),
        "viewer session opened"
    );

    let stream = stream! {
        yield Ok::<Event, Infallible>(
            Event::default()
                .event("ready")
                .data(json!({ "session_id": session_id }).to_string()),
        );

        while let Some(message) = session.next_message().await {
            match message {
                SessionMessage::Change(change) => {
                    match Event::default()
                        .event("change")
                        .id(change.sequence.to_string())
                        .json_data(&change)
                    {
                        Ok(event) => yield Ok(event),
                        Err(err) => warn!(
                            target = "agora::http::live",
                            session_id = %session_id,
                            sequence = change.sequence,
                            error = %err,
                            "failed to encode change event"
                        ),
                    }
                }
                SessionMessage::Lagged => {
                    yield Ok(Event::default().event("lagged").data("resync"));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive))
}
