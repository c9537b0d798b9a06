use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use stowage_domain::{
    DomainError, DomainResult, ListDoorSensorsInput, LookupSensorInput, SensorRegistry,
    SensorSpec, UpdateLastTriggeredInput,
};
use tracing::{debug, info};

/// Registry client over the platform's NATS request-reply RPC.
///
/// The device-registry service owns sensor metadata; this adapter only
/// speaks its wire protocol. A missing reply or a malformed response is a
/// registry failure, not a not-found.
pub struct NatsSensorRegistry {
    client: async_nats::Client,
    base_subject: String,
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    subscriber_id: &'a str,
    sensor_name: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    sensor: Option<SensorSpec>,
}

#[derive(Serialize)]
struct UpdateLastTriggeredRequest<'a> {
    subscriber_id: &'a str,
    sensor_name: &'a str,
    last_triggered: DateTime<Utc>,
}

#[derive(Deserialize)]
struct UpdateResponse {
    modified: u64,
}

#[derive(Serialize)]
struct ListDoorSensorsRequest<'a> {
    subscriber_id: &'a str,
}

#[derive(Deserialize)]
struct ListDoorSensorsResponse {
    sensors: Vec<SensorSpec>,
}

impl NatsSensorRegistry {
    pub fn new(client: async_nats::Client, base_subject: String) -> Self {
        info!(
            "Created NatsSensorRegistry with base subject: {}",
            base_subject
        );
        Self {
            client,
            base_subject,
        }
    }

    async fn request<Req, Resp>(&self, operation: &str, request: &Req) -> DomainResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let subject = format!("{}.{}", self.base_subject, operation);
        let payload = serde_json::to_vec(request)
            .context("Failed to encode registry request")
            .map_err(DomainError::Registry)?;

        debug!(subject = %subject, "Sending registry request");

        let response = self
            .client
            .request(subject, payload.into())
            .await
            .context("Registry request failed")
            .map_err(DomainError::Registry)?;

        serde_json::from_slice(&response.payload)
            .context("Malformed registry response")
            .map_err(DomainError::Registry)
    }
}

#[async_trait]
impl SensorRegistry for NatsSensorRegistry {
    async fn lookup(&self, input: LookupSensorInput) -> DomainResult<Option<SensorSpec>> {
        let response: LookupResponse = self
            .request(
                "get",
                &LookupRequest {
                    subscriber_id: &input.subscriber_id,
                    sensor_name: &input.sensor_name,
                },
            )
            .await?;
        Ok(response.sensor)
    }

    async fn update_last_triggered(&self, input: UpdateLastTriggeredInput) -> DomainResult<()> {
        let response: UpdateResponse = self
            .request(
                "update-last-triggered",
                &UpdateLastTriggeredRequest {
                    subscriber_id: &input.subscriber_id,
                    sensor_name: &input.sensor_name,
                    last_triggered: input.triggered_at,
                },
            )
            .await?;

        if response.modified == 0 {
            return Err(DomainError::UpdateConflict(input.sensor_name));
        }
        Ok(())
    }

    async fn list_door_sensors(&self, input: ListDoorSensorsInput) -> DomainResult<Vec<SensorSpec>> {
        let response: ListDoorSensorsResponse = self
            .request(
                "doors",
                &ListDoorSensorsRequest {
                    subscriber_id: &input.subscriber_id,
                },
            )
            .await?;
        Ok(response.sensors)
    }
}
