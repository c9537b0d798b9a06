use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Externally visible result of one drain-and-aggregate pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub subscriber_id: String,
    pub sensors: BTreeMap<String, SensorReport>,
}

/// One sensor's entry in the report. Temperature and humidity entries carry
/// the averaged value over the drained readings; door entries carry the live
/// registry state and never involve the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SensorReport {
    #[serde(rename = "TEMPERATURE")]
    Temperature {
        value: f64,
        count: u32,
        violations: Vec<String>,
    },
    #[serde(rename = "HUMIDITY")]
    Humidity {
        value: f64,
        count: u32,
        violations: Vec<String>,
    },
    #[serde(rename = "DOOR")]
    Door {
        open: bool,
        last_triggered: Option<DateTime<Utc>>,
    },
}
