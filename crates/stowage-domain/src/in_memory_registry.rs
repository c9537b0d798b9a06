use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{DomainError, DomainResult};
use crate::registry::{
    ListDoorSensorsInput, LookupSensorInput, SensorRegistry, UpdateLastTriggeredInput,
};
use crate::sensor::{SensorKind, SensorSpec};

/// In-memory implementation of SensorRegistry keyed by subscriber id.
///
/// Used by tests and by self-contained deployments that run without the
/// external device-registry service.
pub struct InMemorySensorRegistry {
    sensors: RwLock<HashMap<String, Vec<SensorSpec>>>,
}

impl InMemorySensorRegistry {
    pub fn new() -> Self {
        Self {
            sensors: RwLock::new(HashMap::new()),
        }
    }

    /// Register a sensor for a subscriber, replacing any existing sensor
    /// with the same name.
    pub async fn register(&self, subscriber_id: &str, spec: SensorSpec) {
        let mut sensors = self.sensors.write().await;
        let set = sensors.entry(subscriber_id.to_string()).or_default();
        set.retain(|existing| existing.name != spec.name);
        set.push(spec);
    }
}

impl Default for InMemorySensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorRegistry for InMemorySensorRegistry {
    async fn lookup(&self, input: LookupSensorInput) -> DomainResult<Option<SensorSpec>> {
        let sensors = self.sensors.read().await;
        Ok(sensors
            .get(&input.subscriber_id)
            .and_then(|set| set.iter().find(|spec| spec.name == input.sensor_name))
            .cloned())
    }

    async fn update_last_triggered(&self, input: UpdateLastTriggeredInput) -> DomainResult<()> {
        let mut sensors = self.sensors.write().await;
        let spec = sensors
            .get_mut(&input.subscriber_id)
            .and_then(|set| set.iter_mut().find(|spec| spec.name == input.sensor_name));

        match spec {
            Some(SensorSpec {
                kind: SensorKind::Door { last_triggered, .. },
                ..
            }) => {
                *last_triggered = Some(input.triggered_at);
                Ok(())
            }
            // Missing or non-door: nothing was modified.
            _ => Err(DomainError::UpdateConflict(input.sensor_name)),
        }
    }

    async fn list_door_sensors(&self, input: ListDoorSensorsInput) -> DomainResult<Vec<SensorSpec>> {
        let sensors = self.sensors.read().await;
        Ok(sensors
            .get(&input.subscriber_id)
            .map(|set| {
                set.iter()
                    .filter(|spec| spec.kind.is_door())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
