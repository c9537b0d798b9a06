use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::accumulator::{MeasurementKind, SensorAccumulator};
use crate::classifier::ReadingClassifier;
use crate::error::{DomainError, DomainResult};
use crate::queue::ReadingDrain;
use crate::registry::{ListDoorSensorsInput, SensorRegistry};
use crate::report::{AggregationReport, SensorReport};
use crate::sensor::SensorKind;

/// Domain service for the drain path -- the algorithmic core.
///
/// Flow:
/// 1. Destructively drain the subscriber's queue (snapshot-bounded,
///    deadline-bounded; `QueueEmpty` when nothing is buffered)
/// 2. Re-classify every buffered reading against the current registry
///    state and fold it into its sensor's accumulator
/// 3. Finalize accumulators into averaged report entries
/// 4. Merge the door sensors' live registry state, fetched fresh
///
/// Per-reading failures (unknown sensor, missing measurement) are skipped
/// with a warning so one malformed sensor cannot block aggregation for the
/// whole subscriber. The door fetch in step 4 is the one exception: if the
/// registry errors there, the entire call fails.
pub struct AggregationService {
    classifier: ReadingClassifier,
    registry: Arc<dyn SensorRegistry>,
    drain: Arc<dyn ReadingDrain>,
}

impl AggregationService {
    pub fn new(registry: Arc<dyn SensorRegistry>, drain: Arc<dyn ReadingDrain>) -> Self {
        Self {
            classifier: ReadingClassifier::new(registry.clone()),
            registry,
            drain,
        }
    }

    #[instrument(skip(self))]
    pub async fn drain_and_aggregate(&self, subscriber_id: &str) -> DomainResult<AggregationReport> {
        // 1. Snapshot drain; QueueEmpty propagates.
        let readings = self.drain.drain(subscriber_id).await?;
        debug!(
            subscriber_id,
            reading_count = readings.len(),
            "drained subscriber queue"
        );

        // 2. Re-classify and fold. Each reading is processed exactly once
        // per drain; metadata is resolved fresh because thresholds may have
        // changed since publish time.
        let mut accumulators: HashMap<String, SensorAccumulator> = HashMap::new();
        for reading in &readings {
            let classified = match self.classifier.classify(reading).await {
                Ok(classified) => classified,
                Err(error) => {
                    warn!(subscriber_id, %error, "skipping unclassifiable reading");
                    continue;
                }
            };
            let sensor_name = classified.spec.name;

            match classified.spec.kind {
                SensorKind::Temperature {
                    max_temperature,
                    min_temperature,
                } => match reading.temperature {
                    Some(value) => accumulators
                        .entry(sensor_name)
                        .or_insert_with(|| SensorAccumulator::new(MeasurementKind::Temperature))
                        .record(value, max_temperature, min_temperature),
                    None => {
                        let error = DomainError::MissingMeasurement(sensor_name);
                        warn!(subscriber_id, %error, "skipping reading without measurement");
                    }
                },
                SensorKind::Humidity {
                    max_humidity,
                    min_humidity,
                } => match reading.humidity_level {
                    Some(value) => accumulators
                        .entry(sensor_name)
                        .or_insert_with(|| SensorAccumulator::new(MeasurementKind::Humidity))
                        .record(value, max_humidity, min_humidity),
                    None => {
                        let error = DomainError::MissingMeasurement(sensor_name);
                        warn!(subscriber_id, %error, "skipping reading without measurement");
                    }
                },
                SensorKind::Door { .. } => {
                    // Door events never enter the queue; one here means an
                    // out-of-band publish. It carries no measurement and is
                    // dropped.
                    warn!(
                        subscriber_id,
                        sensor = %sensor_name,
                        "ignoring door reading found in queue"
                    );
                }
            }
        }

        // 3. Finalize accumulators into averaged entries.
        let mut sensors: BTreeMap<String, SensorReport> = BTreeMap::new();
        for (name, accumulator) in accumulators {
            if let Some(report) = accumulator.finalize() {
                sensors.insert(name, report);
            }
        }

        // 4. Merge door state, read fresh from the registry. A failure here
        // fails the whole call.
        let doors = self
            .registry
            .list_door_sensors(ListDoorSensorsInput {
                subscriber_id: subscriber_id.to_string(),
            })
            .await?;
        for door in doors {
            if let SensorKind::Door {
                open,
                last_triggered,
                ..
            } = door.kind
            {
                sensors.insert(
                    door.name,
                    SensorReport::Door {
                        open,
                        last_triggered,
                    },
                );
            }
        }

        debug!(
            subscriber_id,
            sensor_count = sensors.len(),
            "built aggregation report"
        );

        Ok(AggregationReport {
            subscriber_id: subscriber_id.to_string(),
            sensors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MockReadingDrain;
    use crate::reading::RawReading;
    use crate::registry::{LookupSensorInput, MockSensorRegistry};
    use crate::sensor::SensorSpec;

    fn temperature_reading(sensor_name: &str, value: f64) -> RawReading {
        RawReading {
            subscriber_id: Some("ana".to_string()),
            sensor_name: Some(sensor_name.to_string()),
            temperature: Some(value),
            humidity_level: None,
            recorded_at: None,
        }
    }

    fn kitchen_spec(max: Option<f64>) -> SensorSpec {
        SensorSpec {
            name: "kitchen".to_string(),
            kind: SensorKind::Temperature {
                max_temperature: max,
                min_temperature: None,
            },
        }
    }

    fn registry_with_kitchen(max: Option<f64>) -> MockSensorRegistry {
        let mut mock_registry = MockSensorRegistry::new();
        mock_registry
            .expect_lookup()
            .withf(|input: &LookupSensorInput| input.sensor_name == "kitchen")
            .returning(move |_| Ok(Some(kitchen_spec(max))));
        mock_registry
            .expect_list_door_sensors()
            .returning(|_| Ok(vec![]));
        mock_registry
    }

    #[tokio::test]
    async fn test_fifo_drain_aggregates_every_reading() {
        // Arrange
        let mock_registry = registry_with_kitchen(None);
        let mut mock_drain = MockReadingDrain::new();
        mock_drain.expect_drain().times(1).return_once(|_| {
            Ok(vec![
                temperature_reading("kitchen", 20.0),
                temperature_reading("kitchen", 22.0),
                temperature_reading("kitchen", 24.0),
            ])
        });

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let report = service.drain_and_aggregate("ana").await.unwrap();

        // Assert
        assert_eq!(report.subscriber_id, "ana");
        assert_eq!(
            report.sensors.get("kitchen"),
            Some(&SensorReport::Temperature {
                value: 22.0,
                count: 3,
                violations: vec![],
            })
        );
    }

    #[tokio::test]
    async fn test_threshold_violation_is_reported() {
        // Arrange
        let mock_registry = registry_with_kitchen(Some(25.0));
        let mut mock_drain = MockReadingDrain::new();
        mock_drain
            .expect_drain()
            .times(1)
            .return_once(|_| Ok(vec![temperature_reading("kitchen", 30.0)]));

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let report = service.drain_and_aggregate("ana").await.unwrap();

        // Assert
        match report.sensors.get("kitchen").unwrap() {
            SensorReport::Temperature {
                value,
                count,
                violations,
            } => {
                assert_eq!(*value, 30.0);
                assert_eq!(*count, 1);
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("30"));
            }
            other => panic!("unexpected report entry: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_queue_empty_propagates() {
        // Arrange
        let mock_registry = MockSensorRegistry::new();
        let mut mock_drain = MockReadingDrain::new();
        mock_drain
            .expect_drain()
            .times(1)
            .return_once(|subscriber_id| Err(DomainError::QueueEmpty(subscriber_id.to_string())));

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let result = service.drain_and_aggregate("ana").await;

        // Assert: never an empty-but-successful report
        assert!(matches!(result, Err(DomainError::QueueEmpty(_))));
    }

    #[tokio::test]
    async fn test_unclassifiable_reading_is_skipped() {
        // Arrange: one registered sensor, one unknown, one missing its name
        let mut mock_registry = MockSensorRegistry::new();
        mock_registry
            .expect_lookup()
            .returning(|input: LookupSensorInput| {
                if input.sensor_name == "kitchen" {
                    Ok(Some(kitchen_spec(None)))
                } else {
                    Ok(None)
                }
            });
        mock_registry
            .expect_list_door_sensors()
            .returning(|_| Ok(vec![]));

        let mut mock_drain = MockReadingDrain::new();
        mock_drain.expect_drain().times(1).return_once(|_| {
            Ok(vec![
                temperature_reading("kitchen", 21.0),
                temperature_reading("attic", 19.0),
                RawReading {
                    subscriber_id: Some("ana".to_string()),
                    sensor_name: None,
                    temperature: Some(3.0),
                    humidity_level: None,
                    recorded_at: None,
                },
            ])
        });

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let report = service.drain_and_aggregate("ana").await.unwrap();

        // Assert: the malformed readings did not abort the drain or leak
        // into any accumulator
        assert_eq!(report.sensors.len(), 1);
        assert_eq!(
            report.sensors.get("kitchen"),
            Some(&SensorReport::Temperature {
                value: 21.0,
                count: 1,
                violations: vec![],
            })
        );
    }

    #[tokio::test]
    async fn test_reading_without_measurement_is_skipped() {
        // Arrange
        let mock_registry = registry_with_kitchen(None);
        let mut mock_drain = MockReadingDrain::new();
        mock_drain.expect_drain().times(1).return_once(|_| {
            Ok(vec![
                temperature_reading("kitchen", 21.0),
                RawReading {
                    subscriber_id: Some("ana".to_string()),
                    sensor_name: Some("kitchen".to_string()),
                    temperature: None,
                    humidity_level: None,
                    recorded_at: None,
                },
            ])
        });

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let report = service.drain_and_aggregate("ana").await.unwrap();

        // Assert: count reflects only readings that carried a measurement
        assert_eq!(
            report.sensors.get("kitchen"),
            Some(&SensorReport::Temperature {
                value: 21.0,
                count: 1,
                violations: vec![],
            })
        );
    }

    #[tokio::test]
    async fn test_door_state_is_merged_from_registry() {
        // Arrange
        let mut mock_registry = registry_with_kitchen(None);
        // Replace the default empty door list with a live door sensor.
        mock_registry.checkpoint();
        mock_registry
            .expect_lookup()
            .returning(|_| Ok(Some(kitchen_spec(None))));
        mock_registry
            .expect_list_door_sensors()
            .withf(|input: &ListDoorSensorsInput| input.subscriber_id == "ana")
            .times(1)
            .return_once(|_| {
                Ok(vec![SensorSpec {
                    name: "front-door".to_string(),
                    kind: SensorKind::Door {
                        open: true,
                        description: None,
                        last_triggered: None,
                    },
                }])
            });

        let mut mock_drain = MockReadingDrain::new();
        mock_drain
            .expect_drain()
            .times(1)
            .return_once(|_| Ok(vec![temperature_reading("kitchen", 21.0)]));

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let report = service.drain_and_aggregate("ana").await.unwrap();

        // Assert
        assert_eq!(
            report.sensors.get("front-door"),
            Some(&SensorReport::Door {
                open: true,
                last_triggered: None,
            })
        );
    }

    #[tokio::test]
    async fn test_door_fetch_failure_fails_the_call() {
        // Arrange
        let mut mock_registry = MockSensorRegistry::new();
        mock_registry
            .expect_lookup()
            .returning(|_| Ok(Some(kitchen_spec(None))));
        mock_registry
            .expect_list_door_sensors()
            .times(1)
            .return_once(|_| Err(DomainError::Registry(anyhow::anyhow!("registry down"))));

        let mut mock_drain = MockReadingDrain::new();
        mock_drain
            .expect_drain()
            .times(1)
            .return_once(|_| Ok(vec![temperature_reading("kitchen", 21.0)]));

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let result = service.drain_and_aggregate("ana").await;

        // Assert: asymmetric with the per-reading skip policy, by contract
        assert!(matches!(result, Err(DomainError::Registry(_))));
    }

    #[tokio::test]
    async fn test_door_reading_in_queue_never_reaches_an_accumulator() {
        // Arrange: a door reading smuggled into the queue out-of-band
        let mut mock_registry = MockSensorRegistry::new();
        mock_registry.expect_lookup().returning(|_| {
            Ok(Some(SensorSpec {
                name: "front-door".to_string(),
                kind: SensorKind::Door {
                    open: false,
                    description: None,
                    last_triggered: None,
                },
            }))
        });
        mock_registry
            .expect_list_door_sensors()
            .returning(|_| Ok(vec![]));
        // The drain path never writes door state.
        mock_registry.expect_update_last_triggered().times(0);

        let mut mock_drain = MockReadingDrain::new();
        mock_drain.expect_drain().times(1).return_once(|_| {
            Ok(vec![RawReading {
                subscriber_id: Some("ana".to_string()),
                sensor_name: Some("front-door".to_string()),
                temperature: None,
                humidity_level: None,
                recorded_at: None,
            }])
        });

        let service = AggregationService::new(Arc::new(mock_registry), Arc::new(mock_drain));

        // Act
        let report = service.drain_and_aggregate("ana").await.unwrap();

        // Assert
        assert!(report.sensors.is_empty());
    }
}
