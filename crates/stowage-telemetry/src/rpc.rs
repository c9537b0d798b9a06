use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stowage_domain::{AggregationService, DomainError, IngestService, RawReading};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// JSON error envelope returned to RPC callers, mirroring the HTTP-style
/// codes the gateway maps onto its responses.
#[derive(Debug, Serialize)]
struct ErrorReply {
    code: u16,
    message: String,
}

/// Report requests carry the subscriber whose queue should be drained.
#[derive(Debug, Deserialize)]
struct ReportRequest {
    #[serde(default)]
    subscriber_id: Option<String>,
}

pub struct RpcConfig {
    pub ingest_subject: String,
    pub report_subject: String,
    pub queue_group: String,
}

/// Request-reply host for the two pipeline operations: ingest a raw reading,
/// drain-and-report a subscriber. Authentication and HTTP routing live in
/// the gateway; this host only speaks the platform's broker RPC.
pub struct TelemetryRpc {
    client: async_nats::Client,
    ingest: Arc<IngestService>,
    aggregation: Arc<AggregationService>,
    config: RpcConfig,
}

impl TelemetryRpc {
    pub fn new(
        client: async_nats::Client,
        ingest: Arc<IngestService>,
        aggregation: Arc<AggregationService>,
        config: RpcConfig,
    ) -> Self {
        Self {
            client,
            ingest,
            aggregation,
            config,
        }
    }

    pub async fn run(&self, ctx: CancellationToken) -> Result<()> {
        let mut ingest_sub = self
            .client
            .queue_subscribe(
                self.config.ingest_subject.clone(),
                self.config.queue_group.clone(),
            )
            .await
            .context("Failed to subscribe to ingest subject")?;
        let mut report_sub = self
            .client
            .queue_subscribe(
                self.config.report_subject.clone(),
                self.config.queue_group.clone(),
            )
            .await
            .context("Failed to subscribe to report subject")?;

        info!(
            ingest_subject = %self.config.ingest_subject,
            report_subject = %self.config.report_subject,
            "Telemetry RPC host started"
        );

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("Received shutdown signal, stopping RPC host");
                    break;
                }
                Some(message) = ingest_sub.next() => {
                    self.handle_ingest(message).await;
                }
                Some(message) = report_sub.next() => {
                    self.handle_report(message).await;
                }
            }
        }

        info!("Telemetry RPC host stopped gracefully");
        Ok(())
    }

    async fn handle_ingest(&self, message: async_nats::Message) {
        let Some(reply) = message.reply.clone() else {
            warn!(subject = %message.subject, "Ingest request without reply subject, dropping");
            return;
        };

        let reading = match serde_json::from_slice::<RawReading>(&message.payload) {
            Ok(reading) => reading,
            Err(error) => {
                self.reply_error(reply, 400, format!("Malformed sensor payload: {}", error))
                    .await;
                return;
            }
        };

        match self.ingest.process_reading(reading).await {
            Ok(confirmation) => {
                debug!("Ingest request processed");
                self.reply(reply, confirmation.as_bytes().to_vec()).await;
            }
            Err(error) => self.reply_domain_error(reply, error).await,
        }
    }

    async fn handle_report(&self, message: async_nats::Message) {
        let Some(reply) = message.reply.clone() else {
            warn!(subject = %message.subject, "Report request without reply subject, dropping");
            return;
        };

        let subscriber_id = serde_json::from_slice::<ReportRequest>(&message.payload)
            .ok()
            .and_then(|request| request.subscriber_id)
            .filter(|id| !id.is_empty());
        let Some(subscriber_id) = subscriber_id else {
            self.reply_error(reply, 400, "No subscriber_id in report request".to_string())
                .await;
            return;
        };

        match self.aggregation.drain_and_aggregate(&subscriber_id).await {
            Ok(report) => match serde_json::to_vec(&report) {
                Ok(body) => {
                    debug!(subscriber_id = %subscriber_id, "Report request processed");
                    self.reply(reply, body).await;
                }
                Err(error) => {
                    self.reply_error(reply, 500, format!("Failed to encode report: {}", error))
                        .await;
                }
            },
            Err(error) => self.reply_domain_error(reply, error).await,
        }
    }

    async fn reply(&self, subject: async_nats::Subject, body: Vec<u8>) {
        if let Err(error) = self.client.publish(subject, body.into()).await {
            error!(%error, "Failed to send RPC reply");
        }
    }

    async fn reply_domain_error(&self, subject: async_nats::Subject, error: DomainError) {
        warn!(code = error.status_code(), %error, "Request failed");
        self.reply_error(subject, error.status_code(), error.to_string())
            .await;
    }

    async fn reply_error(&self, subject: async_nats::Subject, code: u16, message: String) {
        match serde_json::to_vec(&ErrorReply { code, message }) {
            Ok(body) => self.reply(subject, body).await,
            Err(error) => error!(%error, "Failed to encode error reply"),
        }
    }
}
