use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::classifier::ReadingClassifier;
use crate::error::DomainResult;
use crate::queue::ReadingProducer;
use crate::reading::RawReading;
use crate::registry::{SensorRegistry, UpdateLastTriggeredInput};
use crate::sensor::SensorKind;

/// Domain service for the publish path.
///
/// Flow:
/// 1. Classify the raw reading (shape validation + registry lookup)
/// 2. Door events take the immediate-write lane: the current wall-clock
///    time is written to the registry and nothing is queued
/// 3. Temperature and humidity readings are routed to the subscriber's
///    bounded queue
///
/// No retries happen here; a broker failure surfaces to the caller as a
/// transient error.
pub struct IngestService {
    classifier: ReadingClassifier,
    registry: Arc<dyn SensorRegistry>,
    producer: Arc<dyn ReadingProducer>,
}

impl IngestService {
    pub fn new(registry: Arc<dyn SensorRegistry>, producer: Arc<dyn ReadingProducer>) -> Self {
        Self {
            classifier: ReadingClassifier::new(registry.clone()),
            registry,
            producer,
        }
    }

    /// Classify and route one incoming reading, returning a short
    /// confirmation string on success.
    #[instrument(skip(self, reading))]
    pub async fn process_reading(&self, reading: RawReading) -> DomainResult<&'static str> {
        let classified = self.classifier.classify(&reading).await?;

        match classified.spec.kind {
            SensorKind::Door { .. } => {
                self.apply_door_event(&classified.subscriber_id, &classified.spec.name)
                    .await?;
            }
            SensorKind::Temperature { .. } | SensorKind::Humidity { .. } => {
                self.producer
                    .publish(&classified.subscriber_id, &reading)
                    .await?;
                debug!(
                    subscriber_id = %classified.subscriber_id,
                    sensor = %classified.spec.name,
                    "queued sensor reading"
                );
            }
        }

        Ok("Sensor processed.")
    }

    /// Immediate-write lane for door events: stamp the registry with the
    /// current wall-clock time. Applying the same event twice leaves the
    /// state at the second timestamp only.
    async fn apply_door_event(&self, subscriber_id: &str, sensor_name: &str) -> DomainResult<()> {
        let triggered_at = Utc::now();
        self.registry
            .update_last_triggered(UpdateLastTriggeredInput {
                subscriber_id: subscriber_id.to_string(),
                sensor_name: sensor_name.to_string(),
                triggered_at,
            })
            .await?;
        debug!(
            subscriber_id = %subscriber_id,
            sensor = %sensor_name,
            %triggered_at,
            "recorded door trigger"
        );
        Ok(())
    }
}
