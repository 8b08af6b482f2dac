//! docflow-storage - document storage service
//!
//! Serves the storage queue over HTTP (`POST /broker`) and talks to the
//! DAS and the BFF through the configured broker transport.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docflow_common::broker::{Broker, HttpBroker, InProcessBroker, Queue};
use docflow_common::config::{BlobBackend, BrokerTransport, Config};
use docflow_storage::blobs::{BlobStore, FsBlobStore, MemoryBlobStore};
use docflow_storage::handlers::StorageMessageHandler;
use docflow_storage::nfts::nft_factory_from_config;
use docflow_storage::{build_images_service, build_router, db, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for docflow-storage
#[derive(Parser, Debug)]
#[command(name = "docflow-storage")]
#[command(about = "Document storage service for docflow")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides server.storage_port)
    #[arg(short, long, env = "DOCFLOW_STORAGE_PORT")]
    port: Option<u16>,

    /// Path to the TOML configuration file
    #[arg(short, long, env = "DOCFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_storage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting docflow-storage v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.storage_port = port;
    }

    let pool = db::init_database(&config.database.path)
        .await
        .context("Failed to initialize database")?;

    let blobs: Arc<dyn BlobStore> = match config.blob_store.backend {
        BlobBackend::Fs => {
            info!("Blob store: {}", config.blob_store.root.display());
            Arc::new(FsBlobStore::new(config.blob_store.root.clone()))
        }
        BlobBackend::Memory => {
            info!("Blob store: in-memory (originals are lost on restart)");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let nft_factory = nft_factory_from_config(&config.nft, pool.clone(), config.broker.timeout())
        .context("Failed to set up NFT backend")?;

    // The in-process transport has no peers: DAS and BFF messages are dropped
    let in_process = Arc::new(InProcessBroker::new());
    let broker: Arc<dyn Broker> = match config.broker.transport {
        BrokerTransport::Http => Arc::new(
            HttpBroker::new(config.broker.endpoints(), config.broker.timeout())
                .context("Failed to build HTTP broker")?,
        ),
        BrokerTransport::InProcess => in_process.clone(),
    };

    let images = build_images_service(pool, blobs, broker, &config.broker, nft_factory);
    let handler = Arc::new(StorageMessageHandler::new(images));
    in_process.register(config.broker.queue(Queue::StorageService), handler.clone());

    let app = build_router(AppState::new(handler));

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .context("Invalid server.host")?;
    let addr = SocketAddr::new(host, config.server.storage_port);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
