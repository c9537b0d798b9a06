use anyhow::{Context, Result};
use async_nats::jetstream;
use async_trait::async_trait;
use bytes::Bytes;

/// Publish seam over the JetStream context so producers can be unit tested
/// without a broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JetStreamPublisher: Send + Sync {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;
}

pub struct NatsJetStreamPublisher {
    jetstream: jetstream::Context,
}

impl NatsJetStreamPublisher {
    pub fn new(jetstream: jetstream::Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl JetStreamPublisher for NatsJetStreamPublisher {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.jetstream
            .publish(subject, payload)
            .await
            .context("Failed to publish message")?
            .await
            .context("Failed to receive publish acknowledgement")?;
        Ok(())
    }
}
