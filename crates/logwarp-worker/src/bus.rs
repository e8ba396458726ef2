//! Event bus client

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("failed to subscribe to {subject}: {reason}")]
    Subscribe { subject: String, reason: String },

    #[error("failed to publish on {subject}: {reason}")]
    Publish { subject: String, reason: String },
}

/// Publishing seam, shared by every running job
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;
}

/// NATS connection
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    pub async fn connect(address: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(address)
            .await
            .map_err(|e| BusError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }

    /// Payloads of every message arriving on `subject`
    pub async fn subscribe(
        &self,
        subject: &str,
    ) -> Result<impl Stream<Item = Vec<u8>> + Unpin + Send, BusError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::Subscribe {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;

        Ok(subscriber.map(|message| message.payload.to_vec()))
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }
}
