use chrono::{DateTime, Utc};

use super::error::OrbitError;
use super::events::{EventKind, OrbitEvent};

/// A complete arc: rise, peak and set all inside the query window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassWindow {
    pub rise: DateTime<Utc>,
    pub culmination: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub set: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
enum PassState {
    Idle,
    Rising {
        rise: DateTime<Utc>,
    },
    Culminated {
        rise: DateTime<Utc>,
        culmination: DateTime<Utc>,
        max_elevation_deg: f64,
    },
}

/// Folds a time-ordered event stream into complete passes.
///
/// Anything that does not run rise -> culmination -> set is dropped: an arc
/// already in progress when the window opens, one still in progress when it
/// closes, or a rise/set pair with no peak in between.
pub struct PassAccumulator {
    state: PassState,
}

impl Default for PassAccumulator {
    fn default() -> Self {
        Self {
            state: PassState::Idle,
        }
    }
}

impl PassAccumulator {
    /// Feed one event. `elevation_at` is only called for culminations.
    pub fn push<F>(
        &mut self,
        event: OrbitEvent,
        elevation_at: F,
    ) -> Result<Option<PassWindow>, OrbitError>
    where
        F: FnOnce(DateTime<Utc>) -> Result<f64, OrbitError>,
    {
        let (next, completed) = match (self.state, event.kind) {
            // A repeated rise (window edge) replaces the earlier one.
            (_, EventKind::Rise) => (PassState::Rising { rise: event.time }, None),
            (PassState::Rising { rise }, EventKind::Culmination) => (
                PassState::Culminated {
                    rise,
                    culmination: event.time,
                    max_elevation_deg: round2(elevation_at(event.time)?),
                },
                None,
            ),
            (
                PassState::Culminated {
                    rise,
                    culmination,
                    max_elevation_deg,
                },
                EventKind::Culmination,
            ) => {
                let elevation = round2(elevation_at(event.time)?);
                let state = if elevation > max_elevation_deg {
                    PassState::Culminated {
                        rise,
                        culmination: event.time,
                        max_elevation_deg: elevation,
                    }
                } else {
                    PassState::Culminated {
                        rise,
                        culmination,
                        max_elevation_deg,
                    }
                };
                (state, None)
            }
            (
                PassState::Culminated {
                    rise,
                    culmination,
                    max_elevation_deg,
                },
                EventKind::Set,
            ) => (
                PassState::Idle,
                Some(PassWindow {
                    rise,
                    culmination,
                    max_elevation_deg,
                    set: event.time,
                }),
            ),
            (PassState::Rising { .. }, EventKind::Set) => (PassState::Idle, None),
            (PassState::Idle, _) => (PassState::Idle, None),
        };

        self.state = next;
        Ok(completed)
    }
}

pub fn reduce_events<F>(
    events: &[OrbitEvent],
    mut elevation_at: F,
) -> Result<Vec<PassWindow>, OrbitError>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, OrbitError>,
{
    let mut accumulator = PassAccumulator::default();
    let mut passes = Vec::new();
    for event in events {
        if let Some(pass) = accumulator.push(*event, &mut elevation_at)? {
            passes.push(pass);
        }
    }
    Ok(passes)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
