//! docflow-storage library - document storage service
//!
//! Owns document metadata (SQLite), originals (blob store) and tokens, and
//! serves the storage queue of the message broker.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use docflow_common::broker::{Broker, BrokerClient, Queue};
use docflow_common::config::BrokerConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod blobs;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod images;
pub mod nfts;
pub mod pagination;

use blobs::BlobStore;
use dispatch::AnalysisDispatcher;
use handlers::StorageMessageHandler;
use images::ImagesService;
use nfts::{NftFactory, NftsService};

/// Documents arrive base64-encoded inside JSON envelopes
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<StorageMessageHandler>,
}

impl AppState {
    pub fn new(handler: Arc<StorageMessageHandler>) -> Self {
        Self { handler }
    }
}

/// Assemble the images service around a broker
///
/// Outbound messages go to the DAS and BFF queues named by `broker_config`.
pub fn build_images_service(
    pool: SqlitePool,
    blobs: Arc<dyn BlobStore>,
    broker: Arc<dyn Broker>,
    broker_config: &BrokerConfig,
    nft_factory: Arc<dyn NftFactory>,
) -> ImagesService {
    let dispatcher = AnalysisDispatcher::new(
        BrokerClient::new(broker.clone(), broker_config.queue(Queue::Das)),
        BrokerClient::new(broker, broker_config.queue(Queue::Bff)),
    );
    ImagesService::new(pool, blobs, dispatcher, NftsService::new(nft_factory))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::broker_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
