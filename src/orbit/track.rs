use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Uniformly spaced instants over `[start, end]`, both ends included.
///
/// The count is `total / step + 1` rounded down, but never below two, and the
/// instants are spread evenly over the whole interval (linspace), so the last
/// sample always lands on `end`.
#[derive(Debug, Clone)]
pub struct Sampler {
    start: DateTime<Utc>,
    span_ms: i64,
    count: usize,
    next: usize,
}

impl Sampler {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step_seconds: u32) -> Self {
        let span_ms = (end - start).num_milliseconds().max(0);
        let step_ms = i64::from(step_seconds.max(1)) * 1000;
        let count = ((span_ms / step_ms) as usize + 1).max(2);
        Self {
            start,
            span_ms,
            count,
            next: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn instant(&self, index: usize) -> DateTime<Utc> {
        let offset = i128::from(self.span_ms) * index as i128 / (self.count as i128 - 1);
        self.start + Duration::milliseconds(offset as i64)
    }
}

impl Iterator for Sampler {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let t = self.instant(self.next);
        self.next += 1;
        Some(t)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Sampler {}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrackPoint {
    pub t_utc: DateTime<Utc>,
    #[schema(value_type = String)]
    pub t_local: DateTime<FixedOffset>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[lon, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LineProperties {
    pub key: String,
    pub catnr: u32,
}

/// GeoJSON-style `Feature` wrapping the track as a `LineString`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LineFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: LineString,
    pub properties: LineProperties,
}

impl LineFeature {
    pub fn from_points(points: &[TrackPoint], key: &str, catnr: u32) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry: LineString {
                kind: "LineString".to_string(),
                coordinates: points.iter().map(|p| [p.lon, p.lat]).collect(),
            },
            properties: LineProperties {
                key: key.to_string(),
                catnr,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn ninety_seconds_at_ten() {
        let samples: Vec<_> = Sampler::new(t0(), t0() + Duration::seconds(90), 10).collect();
        assert_eq!(samples.len(), 10);
        for (i, t) in samples.iter().enumerate() {
            assert_eq!(*t, t0() + Duration::seconds(10 * i as i64));
        }
    }

    #[test]
    fn degenerate_window_still_has_two_samples() {
        let samples: Vec<_> = Sampler::new(t0(), t0(), 10).collect();
        assert_eq!(samples, vec![t0(), t0()]);

        let short: Vec<_> = Sampler::new(t0(), t0() + Duration::seconds(5), 60).collect();
        assert_eq!(short, vec![t0(), t0() + Duration::seconds(5)]);
    }

    #[test]
    fn uneven_step_spreads_over_the_interval() {
        let sampler = Sampler::new(t0(), t0() + Duration::seconds(95), 10);
        assert_eq!(sampler.len(), 10);
        let samples: Vec<_> = sampler.collect();
        assert_eq!(samples.first(), Some(&t0()));
        assert_eq!(samples.last(), Some(&(t0() + Duration::seconds(95))));
        assert!(samples.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn huge_span_keeps_both_ends() {
        let end = t0() + Duration::days(365 * 5000);
        let mut sampler = Sampler::new(t0(), end, 1);
        assert!(sampler.len() > 100_000_000_000);
        assert_eq!(sampler.instant(Sampler::count(&sampler) - 1), end);
        assert_eq!(sampler.next(), Some(t0()));
        assert!(sampler.next().unwrap() > t0());
    }

    #[test]
    fn feature_swaps_to_lon_lat() {
        let zone = FixedOffset::west_opt(3 * 3600).unwrap();
        let points = vec![TrackPoint {
            t_utc: t0(),
            t_local: t0().with_timezone(&zone),
            lat: -34.9,
            lon: -56.16,
        }];
        let feature = LineFeature::from_points(&points, "ISS", 25544);
        assert_eq!(feature.geometry.coordinates, vec![[-56.16, -34.9]]);

        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["type"], "LineString");
        assert_eq!(json["properties"]["catnr"], 25544);

        let point = serde_json::to_value(&points[0]).unwrap();
        assert_eq!(point["lat"], -34.9);
        assert_eq!(point["lon"], -56.16);
    }
}
