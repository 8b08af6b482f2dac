//! BFF queue endpoint
//!
//! The only message the BFF consumes is `analysis/refresh`, which is turned
//! into a [`DocflowEvent::RefreshImageTable`] for the WebSocket clients.

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use docflow_common::broker::{BrokerMessage, BrokerReply, MessageHandler, MessagePattern};
use docflow_common::events::{DocflowEvent, EventBus};
use docflow_common::{Error, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::AppState;

/// Consumer of the BFF queue
#[derive(Clone)]
pub struct BffMessageHandler {
    event_bus: EventBus,
}

impl BffMessageHandler {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl MessageHandler for BffMessageHandler {
    async fn handle(&self, message: BrokerMessage) -> Result<Value> {
        match message.pattern {
            MessagePattern::RefreshAnalysis => {
                debug!("Refresh requested, {} client(s)", self.event_bus.subscriber_count());
                self.event_bus.emit_lossy(DocflowEvent::refresh_image_table());
                Ok(Value::Null)
            }
            other => Err(Error::InvalidInput(format!(
                "{} is not handled by the BFF",
                other
            ))),
        }
    }
}

/// POST /broker
pub async fn receive_message(
    State(state): State<AppState>,
    Json(message): Json<BrokerMessage>,
) -> Response {
    let pattern = message.pattern;
    let event = message.is_event();
    match state.queue_handler.handle(message).await {
        Ok(response) if event => {
            (StatusCode::ACCEPTED, Json(BrokerReply::ok(response))).into_response()
        }
        Ok(response) => Json(BrokerReply::ok(response)).into_response(),
        Err(e) => {
            warn!("Rejected {}: {}", pattern, e);
            (StatusCode::BAD_REQUEST, Json(BrokerReply::error(e.to_string()))).into_response()
        }
    }
}

pub fn broker_routes() -> Router<AppState> {
    Router::new().route("/broker", post(receive_message))
}
