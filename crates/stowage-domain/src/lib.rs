pub mod accumulator;
pub mod aggregation_service;
pub mod classifier;
pub mod error;
pub mod in_memory_registry;
pub mod ingest_service;
pub mod queue;
pub mod reading;
pub mod registry;
pub mod report;
pub mod sensor;

pub use accumulator::{MeasurementKind, SensorAccumulator};
pub use aggregation_service::AggregationService;
pub use classifier::{ClassifiedReading, ReadingClassifier};
pub use error::{DomainError, DomainResult};
pub use in_memory_registry::InMemorySensorRegistry;
pub use ingest_service::IngestService;
pub use queue::{ReadingDrain, ReadingProducer};
pub use reading::RawReading;
pub use registry::{
    ListDoorSensorsInput, LookupSensorInput, SensorRegistry, UpdateLastTriggeredInput,
};
pub use report::{AggregationReport, SensorReport};
pub use sensor::{SensorKind, SensorSpec};
