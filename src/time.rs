use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

/// Fixed display offset attached next to every UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalZone(FixedOffset);

impl Default for LocalZone {
    /// UTC-3 (Uruguay, no daylight saving).
    fn default() -> Self {
        Self(FixedOffset::west_opt(3 * 3600).unwrap_or(Utc.fix()))
    }
}

impl LocalZone {
    pub fn from_hours(hours: f64) -> Option<Self> {
        let seconds = (hours * 3600.0).round() as i32;
        FixedOffset::east_opt(seconds).map(Self)
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    pub fn local(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        utc.with_timezone(&self.0)
    }
}

/// Parse an ISO-8601 instant. A trailing `Z` or explicit offset is honoured;
/// a timestamp without one is taken as UTC.
pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(format!("invalid ISO-8601 timestamp '{}'", raw))
}
