use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire record produced by a physical sensor.
///
/// Untyped and unvalidated until classified; exists only on the wire and
/// inside the subscriber's queue. All fields are optional at this stage --
/// the classifier decides which ones the resolved sensor kind requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub subscriber_id: Option<String>,
    #[serde(default)]
    pub sensor_name: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity_level: Option<f64>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_decodes_with_missing_fields() {
        let reading: RawReading =
            serde_json::from_str(r#"{"sensor_name": "kitchen", "temperature": 21.5}"#).unwrap();

        assert_eq!(reading.subscriber_id, None);
        assert_eq!(reading.sensor_name.as_deref(), Some("kitchen"));
        assert_eq!(reading.temperature, Some(21.5));
        assert_eq!(reading.humidity_level, None);
    }
}
