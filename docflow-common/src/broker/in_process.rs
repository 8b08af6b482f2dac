//! Broker that dispatches to handlers living in the same process

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use super::{Broker, BrokerMessage, MessageHandler};
use crate::{Error, Result};

/// Queue name → handler routing table
#[derive(Default)]
pub struct InProcessBroker {
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
}

impl InProcessBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the consumer of `queue`
    pub fn register(&self, queue: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        let queue = queue.into();
        debug!("Registering in-process handler for {}", queue);
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(queue, handler);
    }

    fn handler(&self, queue: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(queue)
            .cloned()
    }
}

#[async_trait]
impl Broker for InProcessBroker {
    async fn send(&self, queue: &str, message: BrokerMessage) -> Result<Value> {
        let handler = self
            .handler(queue)
            .ok_or_else(|| Error::Broker(format!("No consumer for queue {}", queue)))?;
        handler.handle(message).await
    }

    async fn emit(&self, queue: &str, message: BrokerMessage) -> Result<()> {
        let Some(handler) = self.handler(queue) else {
            warn!("Dropping {} event: no consumer for queue {}", message.pattern, queue);
            return Ok(());
        };

        let queue = queue.to_string();
        tokio::spawn(async move {
            let pattern = message.pattern;
            if let Err(e) = handler.handle(message).await {
                warn!("Event {} on {} failed: {}", pattern, queue, e);
            }
        });
        Ok(())
    }
}
