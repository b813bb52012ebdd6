mod acquisition;
mod clock;
mod error;
mod sources;
mod store;
mod tle;

pub use acquisition::{
    Acquisition, RefreshLedger, RefreshOutcome, DEFAULT_COOLDOWN, DEFAULT_REQUEST_TIMEOUT,
};
pub use clock::{Clock, SystemClock};
pub use error::{AcquisitionError, StoreError, TransportError};
pub use sources::{
    default_sources, fetch_from_source, HttpResponse, ReqwestTransport, SourceConfig, SourceKind,
    SourceOutcome, Transport, DEFAULT_USER_AGENT,
};
pub use store::{ElementStatus, ElementStore, Slot, TleMetadata, TleSource, DEFAULT_TTL};
pub use tle::{locate_in_text, parse_catnr, parse_element_file, TleError, TleRecord};
