use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainResult;
use crate::sensor::SensorSpec;

/// Input for looking up one sensor's metadata
#[derive(Debug, Clone)]
pub struct LookupSensorInput {
    pub subscriber_id: String,
    pub sensor_name: String,
}

/// Input for the door sensors' immediate-write lane
#[derive(Debug, Clone)]
pub struct UpdateLastTriggeredInput {
    pub subscriber_id: String,
    pub sensor_name: String,
    pub triggered_at: DateTime<Utc>,
}

/// Input for fetching all door sensors of one subscriber
#[derive(Debug, Clone)]
pub struct ListDoorSensorsInput {
    pub subscriber_id: String,
}

/// Port to the external device registry holding sensor metadata.
/// Infrastructure (e.g. stowage-nats) implements this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorRegistry: Send + Sync {
    /// Fetch metadata for a `(subscriber, sensor_name)` pair. Read-only.
    async fn lookup(&self, input: LookupSensorInput) -> DomainResult<Option<SensorSpec>>;

    /// Overwrite a door sensor's `last_triggered` state. Last write wins.
    /// Fails with `UpdateConflict` when zero entries were modified (the
    /// sensor disappeared between classification and write).
    async fn update_last_triggered(&self, input: UpdateLastTriggeredInput) -> DomainResult<()>;

    /// All door sensors registered for the subscriber. Door state is never
    /// queued, so reports always read it fresh from here.
    async fn list_door_sensors(&self, input: ListDoorSensorsInput) -> DomainResult<Vec<SensorSpec>>;
}
