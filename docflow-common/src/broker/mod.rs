//! Message broker contract between the BFF, the storage service and the
//! document analysis service (DAS)
//!
//! Every exchange is a [`BrokerMessage`] addressed to a named queue. A
//! message with an `id` expects a [`BrokerReply`]; a message without one is
//! an event and is acknowledged without a payload.
//!
//! Two transports implement [`Broker`]:
//! - [`InProcessBroker`]: handlers registered in the same process
//! - [`HttpBroker`]: envelopes POSTed to each service's `/broker` endpoint

mod http;
mod in_process;

pub use http::HttpBroker;
pub use in_process::InProcessBroker;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

// ========================================
// Patterns and queues
// ========================================

/// Routing key of a broker message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessagePattern {
    /// Storage: store a new upload. DAS: analyze one document.
    #[serde(rename = "images/create")]
    UploadNewImage,
    #[serde(rename = "images/update")]
    UpdateImageInformation,
    #[serde(rename = "images/read")]
    GetAllImageInformation,
    #[serde(rename = "images/read-by-id")]
    GetImage,
    #[serde(rename = "images/remove")]
    RemoveImage,
    /// Analysis result coming back from the DAS
    #[serde(rename = "analysis/publish")]
    PublishAnalysis,
    /// Tells the BFF to refresh its clients' document tables
    #[serde(rename = "analysis/refresh")]
    RefreshAnalysis,
    #[serde(rename = "analysis/get")]
    GetImageInformation,
    #[serde(rename = "images/nft")]
    GetImageNft,
    #[serde(rename = "analysis/bundle/create")]
    AnalyzeBundle,
}

impl MessagePattern {
    pub const ALL: [MessagePattern; 10] = [
        MessagePattern::UploadNewImage,
        MessagePattern::UpdateImageInformation,
        MessagePattern::GetAllImageInformation,
        MessagePattern::GetImage,
        MessagePattern::RemoveImage,
        MessagePattern::PublishAnalysis,
        MessagePattern::RefreshAnalysis,
        MessagePattern::GetImageInformation,
        MessagePattern::GetImageNft,
        MessagePattern::AnalyzeBundle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePattern::UploadNewImage => "images/create",
            MessagePattern::UpdateImageInformation => "images/update",
            MessagePattern::GetAllImageInformation => "images/read",
            MessagePattern::GetImage => "images/read-by-id",
            MessagePattern::RemoveImage => "images/remove",
            MessagePattern::PublishAnalysis => "analysis/publish",
            MessagePattern::RefreshAnalysis => "analysis/refresh",
            MessagePattern::GetImageInformation => "analysis/get",
            MessagePattern::GetImageNft => "images/nft",
            MessagePattern::AnalyzeBundle => "analysis/bundle/create",
        }
    }
}

impl fmt::Display for MessagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical queue owned by one service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    StorageService,
    Das,
    Bff,
}

impl Queue {
    pub fn suffix(&self) -> &'static str {
        match self {
            Queue::StorageService => "SKALA_AP4_STORAGE_SERVICE_QUEUE",
            Queue::Das => "SKALA_AP4_DAS_QUEUE",
            Queue::Bff => "SKALA_AP4_BFF_QUEUE",
        }
    }

    /// Queue name on the wire: deployment prefix followed by the suffix
    pub fn name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.suffix())
    }
}

// ========================================
// Envelope
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerMessage {
    pub pattern: MessagePattern,
    #[serde(default)]
    pub data: Value,
    /// Correlation id; present only on requests expecting a reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl BrokerMessage {
    pub fn request(pattern: MessagePattern, data: Value) -> Self {
        Self { pattern, data, id: Some(Uuid::new_v4()) }
    }

    pub fn event(pattern: MessagePattern, data: Value) -> Self {
        Self { pattern, data, id: None }
    }

    pub fn is_event(&self) -> bool {
        self.id.is_none()
    }

    /// Decode the payload; malformed data is the sender's fault
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            Error::InvalidInput(format!("Malformed payload for {}: {}", self.pattern, e))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerReply {
    #[serde(default)]
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl BrokerReply {
    pub fn ok(response: Value) -> Self {
        Self { response, err: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { response: Value::Null, err: Some(message.into()) }
    }

    pub fn into_result(self) -> Result<Value> {
        match self.err {
            Some(err) => Err(Error::Broker(err)),
            None => Ok(self.response),
        }
    }
}

// ========================================
// Transport traits
// ========================================

/// Message transport
#[async_trait]
pub trait Broker: Send + Sync {
    /// Deliver a request and wait for the handler's reply
    async fn send(&self, queue: &str, message: BrokerMessage) -> Result<Value>;

    /// Deliver an event without waiting for it to be handled
    async fn emit(&self, queue: &str, message: BrokerMessage) -> Result<()>;
}

/// Consumer side of a queue
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: BrokerMessage) -> Result<Value>;
}

/// Typed client bound to one queue
#[derive(Clone)]
pub struct BrokerClient {
    broker: Arc<dyn Broker>,
    queue: String,
}

impl BrokerClient {
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self { broker, queue: queue.into() }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Request/response call
    ///
    /// Use `Option<T>` as the response type where the peer may answer
    /// `null`.
    pub async fn send<Req, Resp>(&self, pattern: MessagePattern, data: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let message = BrokerMessage::request(pattern, serde_json::to_value(data)?);
        debug!("Broker send {} -> {}", pattern, self.queue);
        let response = self.broker.send(&self.queue, message).await?;
        serde_json::from_value(response).map_err(|e| {
            Error::Broker(format!("Unexpected reply to {}: {}", pattern, e))
        })
    }

    /// Fire-and-forget call
    pub async fn emit<Req>(&self, pattern: MessagePattern, data: &Req) -> Result<()>
    where
        Req: Serialize + ?Sized + Sync,
    {
        let message = BrokerMessage::event(pattern, serde_json::to_value(data)?);
        debug!("Broker emit {} -> {}", pattern, self.queue);
        self.broker.emit(&self.queue, message).await
    }
}
