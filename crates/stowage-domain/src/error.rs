use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Missing field in sensor payload: {0}")]
    MissingField(&'static str),

    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    #[error("No measurement in reading for sensor: {0}")]
    MissingMeasurement(String),

    #[error("No sensor data queued for subscriber: {0}")]
    QueueEmpty(String),

    #[error("Update for sensor '{0}' modified zero entries")]
    UpdateConflict(String),

    #[error("Broker error: {0}")]
    Broker(#[source] anyhow::Error),

    #[error("Registry error: {0}")]
    Registry(#[source] anyhow::Error),
}

impl DomainError {
    /// HTTP-style status code for the calling layer. The core performs no
    /// retries; transient broker failures surface as 500 and retry policy
    /// belongs to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::MissingField(_) | DomainError::MissingMeasurement(_) => 400,
            DomainError::SensorNotFound(_) | DomainError::QueueEmpty(_) => 404,
            DomainError::UpdateConflict(_) => 409,
            DomainError::Broker(_) | DomainError::Registry(_) => 500,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
