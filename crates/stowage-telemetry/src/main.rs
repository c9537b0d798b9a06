mod config;
mod rpc;
mod telemetry;

use anyhow::{Context, Result};
use config::ServiceConfig;
use rpc::{RpcConfig, TelemetryRpc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stowage_domain::{
    AggregationService, InMemorySensorRegistry, IngestService, SensorRegistry, SensorSpec,
};
use stowage_nats::{
    NatsClient, NatsJetStreamPublisher, NatsReadingDrain, NatsReadingProducer, NatsSensorRegistry,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    telemetry::init_telemetry(&config.log_level);

    info!(
        nats_url = %config.nats_url,
        reading_stream = %config.reading_stream,
        queue_capacity = config.queue_capacity,
        "Starting stowage telemetry service"
    );
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(config).await {
        error!("Service failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServiceConfig) -> Result<()> {
    let nats = NatsClient::connect(
        &config.nats_url,
        Duration::from_secs(config.connect_timeout_secs),
    )
    .await?;
    nats.ensure_reading_stream(&config.reading_stream, config.queue_capacity as i64)
        .await?;

    let registry = build_registry(&config, &nats).await?;

    let publisher = Arc::new(NatsJetStreamPublisher::new(nats.jetstream().clone()));
    let producer = Arc::new(NatsReadingProducer::new(
        publisher,
        config.reading_stream.clone(),
    ));
    let drain = Arc::new(NatsReadingDrain::new(
        nats.jetstream().clone(),
        config.reading_stream.clone(),
        config.queue_capacity,
        Duration::from_secs(config.drain_wait_secs),
    ));

    let ingest = Arc::new(IngestService::new(registry.clone(), producer));
    let aggregation = Arc::new(AggregationService::new(registry, drain));

    let telemetry_rpc = TelemetryRpc::new(
        nats.client().clone(),
        ingest,
        aggregation,
        RpcConfig {
            ingest_subject: config.ingest_subject,
            report_subject: config.report_subject,
            queue_group: config.rpc_queue_group,
        },
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    telemetry_rpc.run(shutdown).await
}

async fn build_registry(
    config: &ServiceConfig,
    nats: &NatsClient,
) -> Result<Arc<dyn SensorRegistry>> {
    match config.registry_mode.as_str() {
        "nats" => {
            info!(registry_subject = %config.registry_subject, "Using external device registry");
            Ok(Arc::new(NatsSensorRegistry::new(
                nats.client().clone(),
                config.registry_subject.clone(),
            )))
        }
        "in-memory" => {
            let registry = InMemorySensorRegistry::new();
            if let Some(path) = &config.registry_seed_path {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read registry seed file {}", path))?;
                let seed: HashMap<String, Vec<SensorSpec>> =
                    serde_json::from_str(&raw).context("Malformed registry seed file")?;
                for (subscriber_id, sensors) in seed {
                    for spec in sensors {
                        registry.register(&subscriber_id, spec).await;
                    }
                }
                info!(path = %path, "Seeded in-memory device registry");
            }
            Ok(Arc::new(registry))
        }
        other => anyhow::bail!("Unknown registry mode: {}", other),
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
