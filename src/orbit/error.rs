use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrbitError {
    #[error("invalid elements: {0}")]
    Elements(String),
    #[error("propagation error: {0}")]
    Propagation(String),
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),
}

impl From<sgp4::TleError> for OrbitError {
    fn from(err: sgp4::TleError) -> Self {
        OrbitError::Elements(err.to_string())
    }
}

impl From<sgp4::ElementsError> for OrbitError {
    fn from(err: sgp4::ElementsError) -> Self {
        OrbitError::Elements(err.to_string())
    }
}

impl From<sgp4::Error> for OrbitError {
    fn from(err: sgp4::Error) -> Self {
        OrbitError::Propagation(err.to_string())
    }
}
