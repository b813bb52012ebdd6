use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::OrbitError;

const COARSE_STEP_SECONDS: i64 = 30;
const FINE_STEP_SECONDS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Rise,
    Culmination,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrbitEvent {
    pub time: DateTime<Utc>,
    pub kind: EventKind,
}

impl OrbitEvent {
    pub fn new(time: DateTime<Utc>, kind: EventKind) -> Self {
        Self { time, kind }
    }
}

/// Find threshold crossings and elevation peaks of `elevation` in
/// `[start, end]`, in time order. Peaks are reported only while above the
/// threshold; a peak that sits on a window edge is not a culmination.
pub fn scan_events<F>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_elevation_deg: f64,
    mut elevation: F,
) -> Result<Vec<OrbitEvent>, OrbitError>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, OrbitError>,
{
    let step = Duration::seconds(COARSE_STEP_SECONDS);
    let mut events = Vec::new();

    let mut before: Option<(DateTime<Utc>, f64)> = None;
    let mut prev = (start, elevation(start)?);

    while prev.0 < end {
        let t = (prev.0 + step).min(end);
        let el = elevation(t)?;

        let was_above = prev.1 >= min_elevation_deg;
        let is_above = el >= min_elevation_deg;
        if !was_above && is_above {
            let at = refine_crossing(prev.0, t, true, min_elevation_deg, &mut elevation)?;
            events.push(OrbitEvent::new(at, EventKind::Rise));
        } else if was_above && !is_above {
            let at = refine_crossing(prev.0, t, false, min_elevation_deg, &mut elevation)?;
            events.push(OrbitEvent::new(at, EventKind::Set));
        }

        if let Some((t_before, el_before)) = before {
            if prev.1 > el_before && prev.1 >= el && prev.1 >= min_elevation_deg {
                let at = refine_peak(t_before, t, &mut elevation)?;
                events.push(OrbitEvent::new(at, EventKind::Culmination));
            }
        }

        before = Some(prev);
        prev = (t, el);
    }

    events.sort_by_key(|e| e.time);
    Ok(events)
}

/// Binary search for the threshold crossing between `before` and `after`.
fn refine_crossing<F>(
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    rising: bool,
    min_elevation_deg: f64,
    elevation: &mut F,
) -> Result<DateTime<Utc>, OrbitError>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, OrbitError>,
{
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let above = elevation(mid)? >= min_elevation_deg;
        if above == rising {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok(high)
}

/// Golden-section search for the elevation maximum inside `[a, b]`.
fn refine_peak<F>(
    a: DateTime<Utc>,
    b: DateTime<Utc>,
    elevation: &mut F,
) -> Result<DateTime<Utc>, OrbitError>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, OrbitError>,
{
    const INV_PHI: f64 = 0.618_033_988_749_895;
    let at = |offset: f64| a + Duration::milliseconds((offset * 1000.0).round() as i64);

    let mut lo = 0.0;
    let mut hi = (b - a).num_milliseconds() as f64 / 1000.0;
    let mut x1 = hi - INV_PHI * (hi - lo);
    let mut x2 = lo + INV_PHI * (hi - lo);
    let mut f1 = elevation(at(x1))?;
    let mut f2 = elevation(at(x2))?;

    while hi - lo > FINE_STEP_SECONDS as f64 {
        if f1 < f2 {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_PHI * (hi - lo);
            f2 = elevation(at(x2))?;
        } else {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_PHI * (hi - lo);
            f1 = elevation(at(x1))?;
        }
    }

    Ok(at((lo + hi) / 2.0))
}
