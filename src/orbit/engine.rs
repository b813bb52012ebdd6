use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::error::OrbitError;
use super::geometry::Observer;
use super::passes::{reduce_events, PassWindow};
use super::propagator::{Propagator, SatelliteHandle};
use super::track::{LineFeature, Sampler, TrackPoint};
use crate::elements::Clock;
use crate::time::LocalZone;

pub const STEP_SECONDS_RANGE: (u32, u32) = (1, 120);
pub const TRACK_MINUTES_RANGE: (u32, u32) = (1, 180);
pub const PASS_HOURS_RANGE: (u32, u32) = (1, 240);
pub const MIN_ELEVATION_RANGE: (f64, f64) = (0.0, 90.0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SatelliteRef {
    pub key: String,
    pub catnr: u32,
}

impl From<&SatelliteHandle> for SatelliteRef {
    fn from(sat: &SatelliteHandle) -> Self {
        Self {
            key: sat.key.clone(),
            catnr: sat.catnr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Subpoint {
    pub lat: f64,
    pub lon: f64,
    pub alt_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PositionReport {
    pub satellite: SatelliteRef,
    pub t_utc: DateTime<Utc>,
    #[schema(value_type = String)]
    pub t_local: DateTime<FixedOffset>,
    pub position: Subpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrackReport {
    pub satellite: SatelliteRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
    pub step_seconds: u32,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    #[schema(value_type = String)]
    pub start_local: DateTime<FixedOffset>,
    #[schema(value_type = String)]
    pub end_local: DateTime<FixedOffset>,
    pub points: Vec<TrackPoint>,
    pub geojson: LineFeature,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PassEvent {
    pub rise_utc: DateTime<Utc>,
    #[schema(value_type = String)]
    pub rise_local: DateTime<FixedOffset>,
    pub culmination_utc: DateTime<Utc>,
    #[schema(value_type = String)]
    pub culmination_local: DateTime<FixedOffset>,
    pub max_elevation_deg: f64,
    pub set_utc: DateTime<Utc>,
    #[schema(value_type = String)]
    pub set_local: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PassReport {
    pub satellite: SatelliteRef,
    pub observer: Observer,
    pub hours: u32,
    pub min_elevation_deg: f64,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    #[schema(value_type = String)]
    pub start_local: DateTime<FixedOffset>,
    #[schema(value_type = String)]
    pub end_local: DateTime<FixedOffset>,
    pub passes: Vec<PassEvent>,
}

/// Position, ground track and pass queries on top of a propagator.
pub struct OrbitEngine {
    propagator: Arc<dyn Propagator>,
    zone: LocalZone,
    clock: Arc<dyn Clock>,
}

impl OrbitEngine {
    pub fn new(propagator: Arc<dyn Propagator>, zone: LocalZone, clock: Arc<dyn Clock>) -> Self {
        Self {
            propagator,
            zone,
            clock,
        }
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    pub fn current_position(&self, sat: &SatelliteHandle) -> Result<PositionReport, OrbitError> {
        let now = self.clock.now();
        let state = self.propagator.propagate(sat, now)?;
        let point = self.propagator.subpoint(&state);

        Ok(PositionReport {
            satellite: sat.into(),
            t_utc: now,
            t_local: self.zone.local(now),
            position: Subpoint {
                lat: round_to(point.latitude_deg, 6),
                lon: round_to(point.longitude_deg, 6),
                alt_km: round_to(point.altitude_km, 3),
            },
        })
    }

    pub fn ground_track(
        &self,
        sat: &SatelliteHandle,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_seconds: u32,
    ) -> Result<TrackReport, OrbitError> {
        if end <= start {
            return Err(OrbitError::InvalidTimeRange(
                "end_utc must be after start_utc".into(),
            ));
        }
        let max_span = Duration::minutes(i64::from(TRACK_MINUTES_RANGE.1));
        if end - start > max_span {
            return Err(OrbitError::InvalidTimeRange(format!(
                "track window must not exceed {} minutes",
                TRACK_MINUTES_RANGE.1
            )));
        }
        check_range("step_seconds", step_seconds, STEP_SECONDS_RANGE)?;
        self.sample_track(sat, start, end, step_seconds, None)
    }

    /// Track from now for `minutes`.
    pub fn ground_track_now(
        &self,
        sat: &SatelliteHandle,
        minutes: u32,
        step_seconds: u32,
    ) -> Result<TrackReport, OrbitError> {
        check_range("minutes", minutes, TRACK_MINUTES_RANGE)?;
        check_range("step_seconds", step_seconds, STEP_SECONDS_RANGE)?;

        let start = self.clock.now();
        let end = start + Duration::minutes(i64::from(minutes));
        self.sample_track(sat, start, end, step_seconds, Some(minutes))
    }

    fn sample_track(
        &self,
        sat: &SatelliteHandle,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_seconds: u32,
        minutes: Option<u32>,
    ) -> Result<TrackReport, OrbitError> {
        let sampler = Sampler::new(start, end, step_seconds);
        let mut points = Vec::with_capacity(sampler.len());
        for t in sampler {
            let state = self.propagator.propagate(sat, t)?;
            let point = self.propagator.subpoint(&state);
            points.push(TrackPoint {
                t_utc: t,
                t_local: self.zone.local(t),
                lat: round_to(point.latitude_deg, 6),
                lon: round_to(point.longitude_deg, 6),
            });
        }

        let geojson = LineFeature::from_points(&points, &sat.key, sat.catnr);
        Ok(TrackReport {
            satellite: sat.into(),
            minutes,
            step_seconds,
            start_utc: start,
            end_utc: end,
            start_local: self.zone.local(start),
            end_local: self.zone.local(end),
            points,
            geojson,
        })
    }

    /// Complete passes over `observer` in `[start, start + hours]`. `start`
    /// defaults to now.
    pub fn visibility_passes(
        &self,
        sat: &SatelliteHandle,
        observer: &Observer,
        hours: u32,
        min_elevation_deg: f64,
        start: Option<DateTime<Utc>>,
    ) -> Result<PassReport, OrbitError> {
        check_range("hours", hours, PASS_HOURS_RANGE)?;
        let (min_el, max_el) = MIN_ELEVATION_RANGE;
        if !(min_el..=max_el).contains(&min_elevation_deg) {
            return Err(OrbitError::InvalidTimeRange(format!(
                "min_elevation_deg must be between {} and {}",
                min_el, max_el
            )));
        }

        let start = start.unwrap_or_else(|| self.clock.now());
        let end = start + Duration::hours(i64::from(hours));

        let events = self
            .propagator
            .find_events(sat, observer, start, end, min_elevation_deg)?;
        let windows = reduce_events(&events, |t| {
            self.propagator
                .look_angle(sat, observer, t)
                .map(|angle| angle.altitude_deg)
        })?;

        log::debug!(
            "{} (CATNR={}): {} events, {} complete passes in {}h",
            sat.key,
            sat.catnr,
            events.len(),
            windows.len(),
            hours
        );

        Ok(PassReport {
            satellite: sat.into(),
            observer: *observer,
            hours,
            min_elevation_deg,
            start_utc: start,
            end_utc: end,
            start_local: self.zone.local(start),
            end_local: self.zone.local(end),
            passes: windows.iter().map(|w| self.pass_event(w)).collect(),
        })
    }

    fn pass_event(&self, window: &PassWindow) -> PassEvent {
        PassEvent {
            rise_utc: window.rise,
            rise_local: self.zone.local(window.rise),
            culmination_utc: window.culmination,
            culmination_local: self.zone.local(window.culmination),
            max_elevation_deg: window.max_elevation_deg,
            set_utc: window.set,
            set_local: self.zone.local(window.set),
        }
    }
}

fn check_range(name: &str, value: u32, (min, max): (u32, u32)) -> Result<(), OrbitError> {
    if value < min || value > max {
        return Err(OrbitError::InvalidTimeRange(format!(
            "{} must be between {} and {}",
            name, min, max
        )));
    }
    Ok(())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
