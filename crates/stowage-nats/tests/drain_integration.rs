#![cfg(feature = "integration-tests")]

//! End-to-end broker tests. Require a NATS server with JetStream enabled on
//! localhost:4222 (`nats-server -js`).

use std::sync::Arc;
use std::time::Duration;

use stowage_domain::{DomainError, RawReading, ReadingDrain, ReadingProducer};
use stowage_nats::{NatsClient, NatsJetStreamPublisher, NatsReadingDrain, NatsReadingProducer};

const CAPACITY: usize = 5;

fn reading(subscriber_id: &str, value: f64) -> RawReading {
    RawReading {
        subscriber_id: Some(subscriber_id.to_string()),
        sensor_name: Some("kitchen".to_string()),
        temperature: Some(value),
        humidity_level: None,
        recorded_at: None,
    }
}

async fn setup(stream_name: &str) -> (NatsReadingProducer, NatsReadingDrain) {
    let client = NatsClient::connect("nats://localhost:4222", Duration::from_secs(5))
        .await
        .expect("NATS server must be running for integration tests");
    client
        .ensure_reading_stream(stream_name, CAPACITY as i64)
        .await
        .unwrap();

    let producer = NatsReadingProducer::new(
        Arc::new(NatsJetStreamPublisher::new(client.jetstream().clone())),
        stream_name.to_string(),
    );
    let drain = NatsReadingDrain::new(
        client.jetstream().clone(),
        stream_name.to_string(),
        CAPACITY,
        Duration::from_secs(2),
    );
    (producer, drain)
}

#[tokio::test]
async fn test_drain_preserves_publish_order() {
    let stream = format!("readings_fifo_{}", std::process::id());
    let (producer, drain) = setup(&stream).await;

    for value in [20.0, 22.0, 24.0] {
        producer.publish("ana", &reading("ana", value)).await.unwrap();
    }

    let drained = drain.drain("ana").await.unwrap();
    let values: Vec<f64> = drained.iter().filter_map(|r| r.temperature).collect();
    assert_eq!(values, vec![20.0, 22.0, 24.0]);
}

#[tokio::test]
async fn test_overflow_evicts_oldest() {
    let stream = format!("readings_evict_{}", std::process::id());
    let (producer, drain) = setup(&stream).await;

    // capacity + 2 publishes; the oldest two must be unrecoverable
    for value in 1..=(CAPACITY as i64 + 2) {
        producer
            .publish("bor", &reading("bor", value as f64))
            .await
            .unwrap();
    }

    let drained = drain.drain("bor").await.unwrap();
    let values: Vec<f64> = drained.iter().filter_map(|r| r.temperature).collect();
    assert_eq!(values, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
}

#[tokio::test]
async fn test_second_drain_finds_empty_queue() {
    let stream = format!("readings_empty_{}", std::process::id());
    let (producer, drain) = setup(&stream).await;

    producer.publish("eva", &reading("eva", 21.0)).await.unwrap();
    drain.drain("eva").await.unwrap();

    // Consumption is destructive; there is no re-drain of the same data.
    let result = drain.drain("eva").await;
    assert!(matches!(result, Err(DomainError::QueueEmpty(_))));
}

#[tokio::test]
async fn test_drain_is_scoped_to_the_subscriber() {
    let stream = format!("readings_scope_{}", std::process::id());
    let (producer, drain) = setup(&stream).await;

    producer.publish("iva", &reading("iva", 19.0)).await.unwrap();

    let result = drain.drain("nobody").await;
    assert!(matches!(result, Err(DomainError::QueueEmpty(_))));

    let drained = drain.drain("iva").await.unwrap();
    assert_eq!(drained.len(), 1);
}
