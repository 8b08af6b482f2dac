//! docflow-bff library - backend for the document UI
//!
//! Translates the REST API onto storage-queue calls and pushes refresh
//! notifications to browsers over WebSocket.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use docflow_common::broker::BrokerClient;
use docflow_common::events::EventBus;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod gateway;

use api::BffMessageHandler;

/// Uploads carry base64 documents in the JSON body
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Client bound to the storage service queue
    pub storage: BrokerClient,
    /// Event bus feeding the WebSocket gateway
    pub event_bus: EventBus,
    /// Consumer of the BFF's own queue
    pub queue_handler: Arc<BffMessageHandler>,
}

impl AppState {
    pub fn new(storage: BrokerClient, event_bus: EventBus) -> Self {
        let queue_handler = Arc::new(BffMessageHandler::new(event_bus.clone()));
        Self {
            storage,
            event_bus,
            queue_handler,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::image_routes())
        .merge(api::broker_routes())
        .merge(api::health_routes())
        .merge(gateway::gateway_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
