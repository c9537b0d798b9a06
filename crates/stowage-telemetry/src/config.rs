use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Startup timeout for the broker connection in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// JetStream stream holding the per-subscriber reading queues
    #[serde(default = "default_reading_stream")]
    pub reading_stream: String,

    /// Maximum buffered readings per subscriber before the oldest is evicted
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Deadline for the drain consume loop in seconds
    #[serde(default = "default_drain_wait_secs")]
    pub drain_wait_secs: u64,

    // RPC configuration
    /// Subject accepting raw sensor readings
    #[serde(default = "default_ingest_subject")]
    pub ingest_subject: String,

    /// Subject accepting aggregation report requests
    #[serde(default = "default_report_subject")]
    pub report_subject: String,

    /// Queue group shared by replicas of this service
    #[serde(default = "default_rpc_queue_group")]
    pub rpc_queue_group: String,

    // Device registry configuration
    /// Registry backend: "nats" (external registry service) or "in-memory"
    #[serde(default = "default_registry_mode")]
    pub registry_mode: String,

    /// Base subject of the external registry service (registry_mode = "nats")
    #[serde(default = "default_registry_subject")]
    pub registry_subject: String,

    /// Optional JSON seed file for the in-memory registry
    #[serde(default)]
    pub registry_seed_path: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_reading_stream() -> String {
    "sensor_readings".to_string()
}

fn default_queue_capacity() -> usize {
    100
}

fn default_drain_wait_secs() -> u64 {
    5
}

// RPC defaults
fn default_ingest_subject() -> String {
    "telemetry.ingest".to_string()
}

fn default_report_subject() -> String {
    "telemetry.report".to_string()
}

fn default_rpc_queue_group() -> String {
    "stowage-telemetry".to_string()
}

// Registry defaults
fn default_registry_mode() -> String {
    "in-memory".to_string()
}

fn default_registry_subject() -> String {
    "registry.sensors".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("STOWAGE"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::remove_var("STOWAGE_QUEUE_CAPACITY");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.reading_stream, "sensor_readings");
        assert_eq!(config.registry_mode, "in-memory");
        assert_eq!(config.registry_seed_path, None);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("STOWAGE_QUEUE_CAPACITY", "20");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.queue_capacity, 20);

        // Clean up
        std::env::remove_var("STOWAGE_QUEUE_CAPACITY");
    }
}
