//! Realtime gateway: bus events pushed to browsers over WebSocket
//!
//! Each [`DocflowEvent`] becomes one text frame
//! `{"event": <name>, "data": <payload>}`. Frames sent by the client are
//! ignored apart from Close.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use docflow_common::events::DocflowEvent;
use futures::{Sink, SinkExt, StreamExt};
use serde_json::json;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::AppState;

/// Interval between keep-alive pings
pub const PING_INTERVAL: Duration = Duration::from_secs(15);

/// Text frame for one event
pub fn event_frame(event: &DocflowEvent) -> serde_json::Result<String> {
    serde_json::to_string(&json!({
        "event": event.event_name(),
        "data": event.payload(),
    }))
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.event_bus.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, rx: broadcast::Receiver<DocflowEvent>) {
    info!("WebSocket client connected");
    let (sink, mut incoming) = socket.split();

    let forward = forward_events(sink, rx, PING_INTERVAL);
    tokio::pin!(forward);

    loop {
        tokio::select! {
            _ = &mut forward => break,
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    info!("WebSocket client disconnected");
}

/// Push bus events and periodic pings into `sink`
///
/// Returns when the bus closes or the sink stops accepting frames. A
/// lagging receiver skips the events it missed.
pub async fn forward_events<S>(
    mut sink: S,
    mut rx: broadcast::Receiver<DocflowEvent>,
    ping_interval: Duration,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ping = tokio::time::interval(ping_interval);
    // First tick completes immediately
    ping.tick().await;

    loop {
        let frame = tokio::select! {
            _ = ping.tick() => Message::Ping(Vec::new()),
            received = rx.recv() => match received {
                Ok(event) => match event_frame(&event) {
                    Ok(text) => {
                        debug!("WebSocket: sending {}", event.event_name());
                        Message::Text(text)
                    }
                    Err(e) => {
                        warn!("WebSocket: failed to serialize {}: {}", event.event_name(), e);
                        continue;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, skipped {} event(s)", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        if let Err(e) = sink.send(frame).await {
            debug!("WebSocket send failed: {}", e);
            break;
        }
    }
}

pub fn gateway_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
