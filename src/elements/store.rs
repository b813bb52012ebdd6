use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;

use super::clock::Clock;
use super::error::StoreError;
use super::tle::{parse_element_file, TleRecord};

pub const DEFAULT_TTL: Duration = Duration::hours(6);

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TleSource {
    Satnogs,
    TleApi,
    Celestrak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TleMetadata {
    pub catnr: u32,
    pub fetched_at_utc: DateTime<Utc>,
    pub source: TleSource,
}

/// The stored record and its metadata for one catalog number.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub record: TleRecord,
    pub metadata: TleMetadata,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ElementStatus {
    pub catnr: u32,
    pub has_local: bool,
    pub mtime_utc: Option<DateTime<Utc>>,
    pub age_seconds: Option<i64>,
    pub age_minutes: Option<f64>,
    pub ttl_seconds: i64,
    pub stale: bool,
    pub source: Option<TleSource>,
    pub fetched_at_utc: Option<DateTime<Utc>>,
}

/// On-disk cache of the latest trusted element set per catalog number.
///
/// Each catnr owns `tle_<catnr>.txt` and `tle_<catnr>.meta.json`. Both are
/// written through a temporary file and renamed into place, so readers see
/// either the previous or the new file.
pub struct ElementStore {
    dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ElementStore {
    pub fn new(dir: PathBuf, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { dir, ttl, clock }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn tle_path(&self, catnr: u32) -> PathBuf {
        self.dir.join(format!("tle_{}.txt", catnr))
    }

    pub fn meta_path(&self, catnr: u32) -> PathBuf {
        self.dir.join(format!("tle_{}.meta.json", catnr))
    }

    /// Record and metadata together; absent if either is missing or unreadable.
    pub fn read(&self, catnr: u32) -> Option<Slot> {
        let record = self.read_record(catnr)?;
        let metadata = self.metadata(catnr)?;
        Some(Slot { record, metadata })
    }

    /// The stored element set alone. A file that fails the structural checks
    /// is reported as absent.
    pub fn read_record(&self, catnr: u32) -> Option<TleRecord> {
        let path = self.tle_path(catnr);
        let content = fs::read_to_string(&path).ok()?;
        match parse_element_file(&content, catnr) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Ignoring malformed element file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn metadata(&self, catnr: u32) -> Option<TleMetadata> {
        let path = self.meta_path(catnr);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<TleMetadata>(&content) {
            Ok(meta) if meta.catnr == catnr => Some(meta),
            Ok(meta) => {
                log::warn!(
                    "Ignoring metadata {} recorded for catnr {}",
                    path.display(),
                    meta.catnr
                );
                None
            }
            Err(e) => {
                log::warn!("Ignoring unreadable metadata {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn has_record(&self, catnr: u32) -> bool {
        self.tle_path(catnr).is_file()
    }

    pub fn modified_at(&self, catnr: u32) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.tle_path(catnr)).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Replace the slot for `catnr`. The record is written before the
    /// metadata; if the process dies in between, the missing or older
    /// metadata makes the slot look stale and it is fetched again.
    pub fn write(
        &self,
        catnr: u32,
        record: &TleRecord,
        source: TleSource,
    ) -> Result<TleMetadata, StoreError> {
        record.validate(catnr)?;
        fs::create_dir_all(&self.dir)?;

        atomic_write(&self.tle_path(catnr), record.to_file_contents().as_bytes())?;

        let metadata = TleMetadata {
            catnr,
            fetched_at_utc: self.clock.now(),
            source,
        };
        let json = serde_json::to_string_pretty(&metadata)?;
        atomic_write(&self.meta_path(catnr), json.as_bytes())?;

        Ok(metadata)
    }

    /// Time since the elements were fetched, falling back to the element
    /// file's modification time when there is no usable metadata.
    pub fn age(&self, catnr: u32) -> Option<Duration> {
        let reference = match self.metadata(catnr) {
            Some(meta) => meta.fetched_at_utc,
            None => self.modified_at(catnr)?,
        };
        Some(self.clock.now() - reference)
    }

    pub fn is_stale(&self, catnr: u32) -> bool {
        match self.age(catnr) {
            Some(age) => age > self.ttl,
            None => true,
        }
    }

    pub fn status(&self, catnr: u32) -> ElementStatus {
        let metadata = self.metadata(catnr);
        let age_seconds = self.age(catnr).map(|a| a.num_seconds());

        ElementStatus {
            catnr,
            has_local: self.has_record(catnr),
            mtime_utc: self.modified_at(catnr),
            age_seconds,
            age_minutes: age_seconds.map(|s| round2(s as f64 / 60.0)),
            ttl_seconds: self.ttl.num_seconds(),
            stale: self.is_stale(catnr),
            source: metadata.as_ref().map(|m| m.source),
            fetched_at_utc: metadata.map(|m| m.fetched_at_utc),
        }
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    if let Err(e) = fs::write(&tmp, contents).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
