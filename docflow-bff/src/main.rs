//! docflow-bff - REST and WebSocket front for the document UI

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docflow_common::broker::{Broker, BrokerClient, HttpBroker, InProcessBroker, Queue};
use docflow_common::config::{BrokerTransport, Config};
use docflow_common::events::EventBus;
use docflow_bff::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for docflow-bff
#[derive(Parser, Debug)]
#[command(name = "docflow-bff")]
#[command(about = "Backend for the docflow document UI")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides server.bff_port)
    #[arg(short, long, env = "DOCFLOW_BFF_PORT")]
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
                .unwrap_or_else(|_| "docflow_bff=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting docflow-bff v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.bff_port = port;
    }

    let event_bus = EventBus::new(100);

    let in_process = Arc::new(InProcessBroker::new());
    let broker: Arc<dyn Broker> = match config.broker.transport {
        BrokerTransport::Http => Arc::new(
            HttpBroker::new(config.broker.endpoints(), config.broker.timeout())
                .context("Failed to build HTTP broker")?,
        ),
        BrokerTransport::InProcess => {
            warn!("In-process broker: no storage service is reachable from this process");
            in_process.clone()
        }
    };

    let storage = BrokerClient::new(broker, config.broker.queue(Queue::StorageService));
    let state = AppState::new(storage, event_bus);
    in_process.register(config.broker.queue(Queue::Bff), state.queue_handler.clone());

    let app = build_router(state);

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .context("Invalid server.host")?;
    let addr = SocketAddr::new(host, config.server.bff_port);

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
