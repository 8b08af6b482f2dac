//! Event types and in-process event bus
//!
//! The BFF republishes storage-side notifications to every connected UI
//! client through an [`EventBus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Notification pushed to connected UI clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DocflowEvent {
    /// Document list changed (analysis finished, upload landed, ...)
    ///
    /// Sent to UI clients as `refresh_image_table` with an empty payload.
    RefreshImageTable { timestamp: DateTime<Utc> },

    /// A document was deleted through the BFF
    DocumentRemoved { uuid: Uuid, timestamp: DateTime<Utc> },
}

impl DocflowEvent {
    pub fn refresh_image_table() -> Self {
        DocflowEvent::RefreshImageTable { timestamp: Utc::now() }
    }

    pub fn document_removed(uuid: Uuid) -> Self {
        DocflowEvent::DocumentRemoved { uuid, timestamp: Utc::now() }
    }

    /// Event name used on the WebSocket channel
    pub fn event_name(&self) -> &'static str {
        match self {
            DocflowEvent::RefreshImageTable { .. } => "refresh_image_table",
            DocflowEvent::DocumentRemoved { .. } => "document_removed",
        }
    }

    /// Payload sent alongside [`event_name`](Self::event_name)
    pub fn payload(&self) -> serde_json::Value {
        match self {
            DocflowEvent::RefreshImageTable { .. } => serde_json::json!({}),
            DocflowEvent::DocumentRemoved { uuid, .. } => serde_json::json!({ "uuid": uuid }),
        }
    }
}

/// Broadcast bus for [`DocflowEvent`]s
///
/// Non-blocking publish; slow subscribers see `RecvError::Lagged` instead
/// of stalling producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DocflowEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DocflowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; fails when nobody is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DocflowEvent,
    ) -> Result<usize, broadcast::error::SendError<DocflowEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: DocflowEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(DocflowEvent::refresh_image_table().event_name(), "refresh_image_table");
        assert_eq!(
            DocflowEvent::document_removed(Uuid::nil()).event_name(),
            "document_removed"
        );
    }

    #[test]
    fn test_refresh_payload_is_empty_object() {
        assert_eq!(DocflowEvent::refresh_image_table().payload(), serde_json::json!({}));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(DocflowEvent::refresh_image_table()).unwrap();
        assert_eq!(json["type"], "RefreshImageTable");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(16);
        assert!(bus.emit(DocflowEvent::refresh_image_table()).is_err());
        // Lossy variant must not panic
        bus.emit_lossy(DocflowEvent::refresh_image_table());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let delivered = bus.emit(DocflowEvent::refresh_image_table()).unwrap();
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap().event_name(), "refresh_image_table");
        assert_eq!(rx2.recv().await.unwrap().event_name(), "refresh_image_table");
    }

    #[tokio::test]
    async fn test_slow_subscriber_sees_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.emit_lossy(DocflowEvent::refresh_image_table());
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert_eq!(bus.capacity(), 2);
    }
}
