use std::sync::Arc;

use crate::error::{DomainError, DomainResult};
use crate::reading::RawReading;
use crate::registry::{LookupSensorInput, SensorRegistry};
use crate::sensor::SensorSpec;

/// A raw reading that passed validation, together with its resolved
/// registry metadata. Downstream stages dispatch on `spec.kind` without a
/// second registry round-trip.
#[derive(Debug, Clone)]
pub struct ClassifiedReading {
    pub subscriber_id: String,
    pub spec: SensorSpec,
}

/// Validates a raw reading and resolves its sensor metadata.
///
/// One registry read per call; idempotent, no mutation. Metadata may change
/// between publish and drain (e.g. thresholds updated), which is why the
/// drain path re-runs classification per buffered reading.
pub struct ReadingClassifier {
    registry: Arc<dyn SensorRegistry>,
}

impl ReadingClassifier {
    pub fn new(registry: Arc<dyn SensorRegistry>) -> Self {
        Self { registry }
    }

    pub async fn classify(&self, reading: &RawReading) -> DomainResult<ClassifiedReading> {
        let subscriber_id = reading
            .subscriber_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(DomainError::MissingField("subscriber_id"))?;
        let sensor_name = reading
            .sensor_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(DomainError::MissingField("sensor_name"))?;

        let spec = self
            .registry
            .lookup(LookupSensorInput {
                subscriber_id: subscriber_id.to_string(),
                sensor_name: sensor_name.to_string(),
            })
            .await?
            .ok_or_else(|| DomainError::SensorNotFound(sensor_name.to_string()))?;

        Ok(ClassifiedReading {
            subscriber_id: subscriber_id.to_string(),
            spec,
        })
    }
}
