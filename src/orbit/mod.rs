mod engine;
mod error;
mod events;
mod geometry;
mod passes;
mod propagator;
mod track;

pub use engine::{
    OrbitEngine, PassEvent, PassReport, PositionReport, SatelliteRef, Subpoint, TrackReport,
    MIN_ELEVATION_RANGE, PASS_HOURS_RANGE, STEP_SECONDS_RANGE, TRACK_MINUTES_RANGE,
};
pub use error::OrbitError;
pub use events::{scan_events, EventKind, OrbitEvent};
pub use geometry::{GeodeticPoint, LookAngle, Observer};
pub use passes::{reduce_events, PassAccumulator, PassWindow};
pub use propagator::{Propagator, SatelliteHandle, Sgp4Propagator, StateVector};
pub use track::{LineFeature, LineProperties, LineString, Sampler, TrackPoint};
