use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};
use std::fmt;

use super::error::OrbitError;
use super::events::{scan_events, OrbitEvent};
use super::geometry::{
    ecef_to_geodetic, look_angle, teme_to_ecef_position, GeodeticPoint, LookAngle, Observer,
};
use crate::elements::TleRecord;

/// A satellite ready for propagation, built from one element set. It is not
/// kept between queries.
pub struct SatelliteHandle {
    pub key: String,
    pub catnr: u32,
    pub name: String,
    pub elements: Elements,
    pub constants: Constants,
}

impl SatelliteHandle {
    pub fn from_record(key: &str, catnr: u32, record: &TleRecord) -> Result<Self, OrbitError> {
        let elements = Elements::from_tle(
            Some(record.name.clone()),
            record.line1.as_bytes(),
            record.line2.as_bytes(),
        )?;
        let constants = Constants::from_elements(&elements)?;

        Ok(Self {
            key: key.to_string(),
            catnr,
            name: record.name.clone(),
            elements,
            constants,
        })
    }
}

impl fmt::Debug for SatelliteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatelliteHandle")
            .field("key", &self.key)
            .field("catnr", &self.catnr)
            .field("name", &self.name)
            .finish()
    }
}

/// Geocentric state in the TEME frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub time: DateTime<Utc>,
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

/// Orbit propagation and observer geometry.
pub trait Propagator: Send + Sync {
    fn propagate(
        &self,
        sat: &SatelliteHandle,
        time: DateTime<Utc>,
    ) -> Result<StateVector, OrbitError>;

    fn subpoint(&self, state: &StateVector) -> GeodeticPoint;

    fn look_angle(
        &self,
        sat: &SatelliteHandle,
        observer: &Observer,
        time: DateTime<Utc>,
    ) -> Result<LookAngle, OrbitError>;

    /// Rise, culmination and set events for elevation `min_elevation_deg`
    /// within `[start, end]`, in time order.
    fn find_events(
        &self,
        sat: &SatelliteHandle,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_elevation_deg: f64,
    ) -> Result<Vec<OrbitEvent>, OrbitError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4Propagator;

fn gmst(time: DateTime<Utc>) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&time.naive_utc()))
}

impl Propagator for Sgp4Propagator {
    fn propagate(
        &self,
        sat: &SatelliteHandle,
        time: DateTime<Utc>,
    ) -> Result<StateVector, OrbitError> {
        let minutes = sat
            .elements
            .datetime_to_minutes_since_epoch(&time.naive_utc())
            .map_err(|e| OrbitError::Propagation(e.to_string()))?;
        let prediction = sat.constants.propagate(minutes)?;

        Ok(StateVector {
            time,
            position_km: prediction.position,
            velocity_km_s: prediction.velocity,
        })
    }

    fn subpoint(&self, state: &StateVector) -> GeodeticPoint {
        ecef_to_geodetic(teme_to_ecef_position(state.position_km, gmst(state.time)))
    }

    fn look_angle(
        &self,
        sat: &SatelliteHandle,
        observer: &Observer,
        time: DateTime<Utc>,
    ) -> Result<LookAngle, OrbitError> {
        let state = self.propagate(sat, time)?;
        let ecef = teme_to_ecef_position(state.position_km, gmst(time));
        Ok(look_angle(ecef, observer))
    }

    fn find_events(
        &self,
        sat: &SatelliteHandle,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_elevation_deg: f64,
    ) -> Result<Vec<OrbitEvent>, OrbitError> {
        scan_events(start, end, min_elevation_deg, |t| {
            self.look_angle(sat, observer, t).map(|a| a.altitude_deg)
        })
    }
}
