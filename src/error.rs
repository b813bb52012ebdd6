use std::path::PathBuf;
use thiserror::Error;

use crate::elements::{AcquisitionError, StoreError};
use crate::orbit::OrbitError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown satellite '{key}'; options: {}", .options.join(", "))]
    InvalidSatellite { key: String, options: Vec<String> },
    #[error("no usable elements for {key} at {} and none could be fetched", .path.display())]
    NoLocalElements { key: String, path: PathBuf },
    #[error("could not refresh elements for CATNR={catnr} (all sources unavailable)")]
    AcquisitionExhausted { catnr: u32 },
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),
    #[error("propagation failed: {0}")]
    Propagation(String),
    #[error("element store error: {0}")]
    Store(String),
}

impl ServiceError {
    /// Stable machine-readable name.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidSatellite { .. } => "invalid_satellite",
            ServiceError::NoLocalElements { .. } => "no_local_elements",
            ServiceError::AcquisitionExhausted { .. } => "acquisition_exhausted",
            ServiceError::InvalidTimeRange(_) => "invalid_time_range",
            ServiceError::Propagation(_) => "propagation_error",
            ServiceError::Store(_) => "store_error",
        }
    }
}

impl From<OrbitError> for ServiceError {
    fn from(err: OrbitError) -> Self {
        match err {
            OrbitError::InvalidTimeRange(msg) => ServiceError::InvalidTimeRange(msg),
            other => ServiceError::Propagation(other.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err.to_string())
    }
}

impl From<AcquisitionError> for ServiceError {
    fn from(err: AcquisitionError) -> Self {
        match err {
            // A refresh that was skipped produced nothing new either.
            AcquisitionError::CoolingDown { catnr, .. } | AcquisitionError::Exhausted { catnr } => {
                ServiceError::AcquisitionExhausted { catnr }
            }
            AcquisitionError::Store { reason, .. } => ServiceError::Store(reason),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
