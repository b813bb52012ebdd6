use chrono::Duration;
use thiserror::Error;

use super::tle::TleError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("element file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata encoding error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("malformed element set: {0}")]
    Malformed(#[from] TleError),
}

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("refresh for CATNR={catnr} attempted recently; retry in {}s", .retry_in.num_seconds())]
    CoolingDown { catnr: u32, retry_in: Duration },
    #[error("could not refresh elements for CATNR={catnr} (all sources unavailable)")]
    Exhausted { catnr: u32 },
    #[error("could not store elements for CATNR={catnr}: {reason}")]
    Store { catnr: u32, reason: String },
}

#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);
