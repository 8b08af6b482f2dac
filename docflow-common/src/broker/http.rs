//! Broker that POSTs envelopes to the consuming service's `/broker` endpoint

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

use super::{Broker, BrokerMessage, BrokerReply};
use crate::{Error, Result};

pub struct HttpBroker {
    client: reqwest::Client,
    /// Queue name → service base URL
    endpoints: HashMap<String, String>,
}

impl HttpBroker {
    pub fn new(endpoints: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    fn endpoint(&self, queue: &str) -> Result<String> {
        let base = self
            .endpoints
            .get(queue)
            .ok_or_else(|| Error::Broker(format!("No endpoint configured for queue {}", queue)))?;
        Ok(format!("{}/broker", base.trim_end_matches('/')))
    }

    async fn post(&self, queue: &str, message: &BrokerMessage) -> Result<BrokerReply> {
        let url = self.endpoint(queue)?;
        debug!("POST {} ({})", url, message.pattern);

        let response = self.client.post(&url).json(message).send().await.map_err(|e| {
            error!("Broker delivery to {} failed: {}", url, e);
            Error::Broker(format!("Delivery to {} failed: {}", queue, e))
        })?;

        let status = response.status();
        // Consumers answer handler failures with a non-2xx status and an `err` body
        let reply = response.json::<BrokerReply>().await.ok();
        match reply {
            Some(reply) if status.is_success() || reply.err.is_some() => Ok(reply),
            _ if status.is_success() => Ok(BrokerReply::ok(Value::Null)),
            _ => Err(Error::Broker(format!("{} answered HTTP {}", queue, status))),
        }
    }
}

#[async_trait]
impl Broker for HttpBroker {
    async fn send(&self, queue: &str, message: BrokerMessage) -> Result<Value> {
        self.post(queue, &message).await?.into_result()
    }

    async fn emit(&self, queue: &str, message: BrokerMessage) -> Result<()> {
        self.post(queue, &message).await?.into_result().map(|_| ())
    }
}
