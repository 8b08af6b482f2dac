//! Storage service queue endpoint for the HTTP broker transport
//!
//! Requests (envelopes with an `id`) are handled inline and answered with a
//! `BrokerReply`. Events are acknowledged with 202 and handled on a
//! background task.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use docflow_common::broker::{BrokerMessage, BrokerReply};
use serde_json::Value;
use tracing::{error, warn};

use crate::AppState;

/// POST /broker
pub async fn receive_message(
    State(state): State<AppState>,
    Json(message): Json<BrokerMessage>,
) -> Response {
    if message.is_event() {
        let handler = state.handler.clone();
        tokio::spawn(async move {
            let pattern = message.pattern;
            if let Err(e) = handler.dispatch(message).await {
                warn!("Event {} failed: {}", pattern, e);
            }
        });
        return (StatusCode::ACCEPTED, Json(BrokerReply::ok(Value::Null))).into_response();
    }

    let pattern = message.pattern;
    match state.handler.dispatch(message).await {
        Ok(response) => Json(BrokerReply::ok(response)).into_response(),
        Err(e) => {
            error!("{} failed: {}", pattern, e);
            e.into_response()
        }
    }
}

pub fn broker_routes() -> Router<AppState> {
    Router::new().route("/broker", post(receive_message))
}
