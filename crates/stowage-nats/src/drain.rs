use anyhow::Context;
use async_nats::jetstream::{
    self,
    consumer::{pull::Config as PullConfig, AckPolicy, PullConsumer},
};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use stowage_domain::{DomainError, DomainResult, RawReading, ReadingDrain};
use tracing::{debug, warn};

/// One-shot destructive drain over a per-subscriber pull consumer.
///
/// The consumer is durable and shared: concurrent drains against the same
/// subscriber each receive a disjoint subset (WorkQueue retention delivers
/// every reading to at most one caller), which keeps racing drains safe at
/// the broker level while their combined aggregation semantics stay
/// undefined, as the egress contract documents.
pub struct NatsReadingDrain {
    jetstream: jetstream::Context,
    stream_name: String,
    capacity: usize,
    max_wait: Duration,
}

impl NatsReadingDrain {
    pub fn new(
        jetstream: jetstream::Context,
        stream_name: String,
        capacity: usize,
        max_wait: Duration,
    ) -> Self {
        Self {
            jetstream,
            stream_name,
            capacity,
            max_wait,
        }
    }
}

#[async_trait]
impl ReadingDrain for NatsReadingDrain {
    async fn drain(&self, subscriber_id: &str) -> DomainResult<Vec<RawReading>> {
        let consumer_name = format!("drain-{}", subscriber_id);
        let mut consumer: PullConsumer = self
            .jetstream
            .create_consumer_on_stream(
                PullConfig {
                    name: Some(consumer_name.clone()),
                    durable_name: Some(consumer_name),
                    filter_subject: format!("{}.{}", self.stream_name, subscriber_id),
                    ack_policy: AckPolicy::Explicit,
                    ..Default::default()
                },
                self.stream_name.as_str(),
            )
            .await
            .context("Failed to create drain consumer")
            .map_err(DomainError::Broker)?;

        // Pre-flight count: the snapshot this drain is allowed to observe.
        // Readings published after this point belong to the next drain.
        let pending = consumer
            .info()
            .await
            .context("Failed to query queue depth")
            .map_err(DomainError::Broker)?
            .num_pending;
        if pending == 0 {
            return Err(DomainError::QueueEmpty(subscriber_id.to_string()));
        }

        let batch = pending.min(self.capacity as u64) as usize;
        debug!(
            subscriber_id,
            pending, batch, "Draining subscriber reading queue"
        );

        // The expiry bounds the consume loop: if the snapshot count and the
        // actually deliverable count diverge (eviction or a racing drain),
        // the fetch returns what it got instead of hanging.
        let mut fetched = consumer
            .fetch()
            .max_messages(batch)
            .expires(self.max_wait)
            .messages()
            .await
            .context("Failed to fetch buffered readings")
            .map_err(DomainError::Broker)?;

        let mut readings = Vec::with_capacity(batch);
        while let Some(message) = fetched.next().await {
            let message = match message {
                Ok(message) => message,
                Err(error) => {
                    warn!(subscriber_id, %error, "Error receiving message during drain");
                    continue;
                }
            };

            match serde_json::from_slice::<RawReading>(&message.payload) {
                Ok(reading) => readings.push(reading),
                Err(error) => {
                    warn!(subscriber_id, %error, "Skipping undecodable reading payload");
                }
            }

            // Destructive consume: the ack deletes the reading from the
            // work queue; there is no re-drain of the same data.
            if let Err(error) = message.ack().await {
                warn!(subscriber_id, %error, "Failed to acknowledge drained reading");
            }
        }

        if readings.is_empty() {
            // The pre-flight count was positive but the deadline-bounded
            // fetch yielded nothing: a racing drain emptied the lane.
            return Err(DomainError::QueueEmpty(subscriber_id.to_string()));
        }

        debug!(subscriber_id, drained = readings.len(), "Drain complete");
        Ok(readings)
    }
}
