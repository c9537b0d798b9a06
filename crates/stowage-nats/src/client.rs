use anyhow::{Context, Result};
use async_nats::jetstream::{
    self,
    stream::{Config as StreamConfig, DiscardPolicy, RetentionPolicy},
};
use tracing::info;

pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!("Connecting to NATS at {} (timeout={:?})", url, timeout);

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        info!("Successfully connected to NATS");
        Ok(Self { client, jetstream })
    }

    /// Declare the bounded per-subscriber reading stream.
    ///
    /// One subject per subscriber under `<stream>.*` plays the role of a
    /// topic-exchange binding keyed by subscriber identity. WorkQueue
    /// retention deletes a reading once acknowledged (destructive drain),
    /// and `max_messages_per_subject` with drop-oldest discard gives each
    /// subscriber a bounded FIFO lane: when a lane is full the broker
    /// evicts the oldest reading to admit the newest.
    pub async fn ensure_reading_stream(&self, stream_name: &str, capacity: i64) -> Result<()> {
        info!(
            "Ensuring stream '{}' exists (capacity per subscriber: {})",
            stream_name, capacity
        );

        let stream_config = StreamConfig {
            name: stream_name.to_string(),
            subjects: vec![format!("{}.*", stream_name)],
            description: Some("Per-subscriber sensor reading queues".to_string()),
            retention: RetentionPolicy::WorkQueue,
            discard: DiscardPolicy::Old,
            max_messages_per_subject: capacity,
            ..Default::default()
        };

        match self.jetstream.get_stream(stream_name).await {
            Ok(_) => {
                info!("Stream '{}' already exists", stream_name);
            }
            Err(_) => {
                self.jetstream
                    .create_stream(stream_config)
                    .await
                    .context("Failed to create stream")?;
                info!("Created stream '{}'", stream_name);
            }
        }

        Ok(())
    }

    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }
}
