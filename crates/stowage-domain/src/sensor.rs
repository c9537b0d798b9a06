use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry metadata for one sensor. Names are unique within a subscriber's
/// sensor set; the registry itself is owned by the device-registry service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: SensorKind,
}

/// Sensor kind with its type-specific thresholds and state.
///
/// Exhaustive matching over this enum replaces the string/field checks the
/// classifier would otherwise need: a spec without a kind or with the wrong
/// measurement field cannot be constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SensorKind {
    #[serde(rename = "TEMPERATURE")]
    Temperature {
        #[serde(default)]
        max_temperature: Option<f64>,
        #[serde(default)]
        min_temperature: Option<f64>,
    },
    #[serde(rename = "HUMIDITY")]
    Humidity {
        #[serde(default)]
        max_humidity: Option<f64>,
        #[serde(default)]
        min_humidity: Option<f64>,
    },
    #[serde(rename = "DOOR")]
    Door {
        #[serde(default)]
        open: bool,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        last_triggered: Option<DateTime<Utc>>,
    },
}

impl SensorKind {
    pub fn is_door(&self) -> bool {
        matches!(self, SensorKind::Door { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_from_registry_document() {
        let spec: SensorSpec = serde_json::from_str(
            r#"{"name": "kitchen", "type": "TEMPERATURE", "max_temperature": 25.0}"#,
        )
        .unwrap();

        assert_eq!(spec.name, "kitchen");
        assert_eq!(
            spec.kind,
            SensorKind::Temperature {
                max_temperature: Some(25.0),
                min_temperature: None,
            }
        );
    }

    #[test]
    fn test_door_spec_defaults() {
        let spec: SensorSpec =
            serde_json::from_str(r#"{"name": "front-door", "type": "DOOR"}"#).unwrap();

        assert!(spec.kind.is_door());
        assert_eq!(
            spec.kind,
            SensorKind::Door {
                open: false,
                description: None,
                last_triggered: None,
            }
        );
    }

    #[test]
    fn test_spec_without_type_is_rejected() {
        let result = serde_json::from_str::<SensorSpec>(r#"{"name": "kitchen"}"#);
        assert!(result.is_err());
    }
}
