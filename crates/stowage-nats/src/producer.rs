use crate::traits::JetStreamPublisher;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use stowage_domain::{DomainError, DomainResult, RawReading, ReadingProducer};
use tracing::{debug, info};

/// NATS JetStream producer for raw sensor readings.
///
/// The subject `<base>.<subscriber_id>` is the routing key: publishes land
/// only in that subscriber's lane of the bounded stream.
pub struct NatsReadingProducer {
    jetstream: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl NatsReadingProducer {
    pub fn new(jetstream: Arc<dyn JetStreamPublisher>, base_subject: String) -> Self {
        info!(
            "Created NatsReadingProducer with base subject: {}",
            base_subject
        );
        Self {
            jetstream,
            base_subject,
        }
    }
}

#[async_trait]
impl ReadingProducer for NatsReadingProducer {
    async fn publish(&self, subscriber_id: &str, reading: &RawReading) -> DomainResult<()> {
        let payload = serde_json::to_vec(reading)
            .context("Failed to encode sensor reading")
            .map_err(DomainError::Broker)?;

        let subject = format!("{}.{}", self.base_subject, subscriber_id);

        debug!(
            subject = %subject,
            subscriber_id = %subscriber_id,
            size_bytes = payload.len(),
            "Publishing sensor reading"
        );

        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish and acknowledge message")
            .map_err(DomainError::Broker)?;

        debug!(
            subject = %subject,
            subscriber_id = %subscriber_id,
            "Successfully published sensor reading"
        );

        Ok(())
    }
}
