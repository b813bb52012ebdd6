use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::clock::Clock;
use super::error::AcquisitionError;
use super::sources::{fetch_from_source, SourceConfig, SourceOutcome, Transport};
use super::store::{ElementStore, TleSource};

pub const DEFAULT_COOLDOWN: Duration = Duration::minutes(2);
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Refreshed(TleSource),
    CoolingDown { retry_in: Duration },
    Exhausted,
    StoreFailed(String),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed(_))
    }
}

/// Last refresh attempt per catnr. Lives as long as the process.
#[derive(Debug)]
pub struct RefreshLedger {
    cooldown: Duration,
    attempts: Mutex<HashMap<u32, DateTime<Utc>>>,
}

impl RefreshLedger {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Claims an attempt for `catnr` at `now`, or returns how long until the
    /// next one is allowed. Check and claim happen under one lock.
    pub fn try_begin(&self, catnr: u32, now: DateTime<Utc>) -> Result<(), Duration> {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = attempts.get(&catnr) {
            let elapsed = now - *last;
            if elapsed < self.cooldown {
                return Err(self.cooldown - elapsed);
            }
        }
        attempts.insert(catnr, now);
        Ok(())
    }

    pub fn last_attempt(&self, catnr: u32) -> Option<DateTime<Utc>> {
        let attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.get(&catnr).copied()
    }
}

/// Fetches element sets from the configured sources in priority order and
/// commits the first valid one to the store.
pub struct Acquisition {
    store: Arc<ElementStore>,
    transport: Arc<dyn Transport>,
    sources: Vec<SourceConfig>,
    timeout: std::time::Duration,
    clock: Arc<dyn Clock>,
    ledger: RefreshLedger,
}

impl Acquisition {
    pub fn new(
        store: Arc<ElementStore>,
        transport: Arc<dyn Transport>,
        sources: Vec<SourceConfig>,
        cooldown: Duration,
        timeout: std::time::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            transport,
            sources,
            timeout,
            clock,
            ledger: RefreshLedger::new(cooldown),
        }
    }

    pub fn ledger(&self) -> &RefreshLedger {
        &self.ledger
    }

    /// Best effort: `true` only when new elements were stored. On failure
    /// the existing slot is left as it was.
    pub async fn refresh(&self, catnr: u32) -> bool {
        self.refresh_outcome(catnr).await.is_refreshed()
    }

    pub async fn refresh_or_fail(&self, catnr: u32) -> Result<TleSource, AcquisitionError> {
        match self.refresh_outcome(catnr).await {
            RefreshOutcome::Refreshed(source) => Ok(source),
            RefreshOutcome::CoolingDown { retry_in } => {
                Err(AcquisitionError::CoolingDown { catnr, retry_in })
            }
            RefreshOutcome::Exhausted => Err(AcquisitionError::Exhausted { catnr }),
            RefreshOutcome::StoreFailed(reason) => Err(AcquisitionError::Store { catnr, reason }),
        }
    }

    pub async fn refresh_outcome(&self, catnr: u32) -> RefreshOutcome {
        if let Err(retry_in) = self.ledger.try_begin(catnr, self.clock.now()) {
            log::debug!(
                "Skipping refresh of CATNR={}: cooling down for {}s",
                catnr,
                retry_in.num_seconds()
            );
            return RefreshOutcome::CoolingDown { retry_in };
        }

        for source in &self.sources {
            let outcome =
                fetch_from_source(self.transport.as_ref(), source, catnr, self.timeout).await;

            let record = match outcome {
                SourceOutcome::Found(record) => record,
                SourceOutcome::Unavailable(reason) => {
                    log::debug!("CATNR={} source {:?} unavailable: {}", catnr, source.kind, reason);
                    continue;
                }
                SourceOutcome::Malformed(reason) => {
                    log::debug!("CATNR={} source {:?} malformed: {}", catnr, source.kind, reason);
                    continue;
                }
            };

            let tle_source = source.kind.tle_source();
            let store = self.store.clone();
            let written = tokio::task::spawn_blocking(move || {
                store.write(catnr, &record, tle_source).map(|_| record)
            })
            .await;

            return match written {
                Ok(Ok(record)) => {
                    log::info!(
                        "Refreshed elements for CATNR={} ({}) from {}",
                        catnr,
                        record.name,
                        tle_source
                    );
                    RefreshOutcome::Refreshed(tle_source)
                }
                Ok(Err(e)) => {
                    log::error!("Failed to store elements for CATNR={}: {}", catnr, e);
                    RefreshOutcome::StoreFailed(e.to_string())
                }
                Err(e) => {
                    log::error!("Element write task for CATNR={} failed: {}", catnr, e);
                    RefreshOutcome::StoreFailed(e.to_string())
                }
            };
        }

        log::warn!(
            "All {} element sources failed for CATNR={}",
            self.sources.len(),
            catnr
        );
        RefreshOutcome::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::clock::tests::FakeClock;
    use crate::elements::sources::tests::{satnogs_body, FakeTransport};
    use crate::elements::sources::SourceKind;
    use crate::elements::store::DEFAULT_TTL;
    use crate::elements::tle::tests::{iss, ISS_LINE1, ISS_LINE2, ISS_NAME};
    use chrono::TimeZone;
    use tempfile::TempDir;

    const VANGUARD: &str = "VANGUARD 1\n\
        1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753\n\
        2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667\n";

    fn test_sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig::new(SourceKind::SatnogsJson, "https://satnogs.test/{catnr}"),
            SourceConfig::new(SourceKind::TleApiJson, "https://tleapi.test/{catnr}"),
            SourceConfig::new(SourceKind::CelestrakText, "https://celestrak.org.test/{catnr}"),
            SourceConfig::new(SourceKind::CelestrakText, "https://celestrak.com.test/{catnr}"),
        ]
    }

    struct Fixture {
        _dir: TempDir,
        clock: Arc<FakeClock>,
        store: Arc<ElementStore>,
        transport: Arc<FakeTransport>,
        acquisition: Acquisition,
    }

    fn fixture(transport: FakeTransport) -> Fixture {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FakeClock::at(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(ElementStore::new(
            dir.path().to_path_buf(),
            DEFAULT_TTL,
            clock.clone(),
        ));
        let transport = Arc::new(transport);
        let acquisition = Acquisition::new(
            store.clone(),
            transport.clone(),
            test_sources(),
            DEFAULT_COOLDOWN,
            DEFAULT_REQUEST_TIMEOUT,
            clock.clone(),
        );
        Fixture {
            _dir: dir,
            clock,
            store,
            transport,
            acquisition,
        }
    }

    #[tokio::test]
    async fn first_source_wins() {
        let f = fixture(FakeTransport::default().respond("https://satnogs.test", 200, &satnogs_body()));

        assert!(f.acquisition.refresh(25544).await);
        assert_eq!(f.transport.call_count(), 1);

        let slot = f.store.read(25544).unwrap();
        assert_eq!(slot.record, iss());
        assert_eq!(slot.metadata.source, TleSource::Satnogs);
    }

    #[tokio::test]
    async fn falls_back_to_plain_text_catalog() {
        let text = format!(
            "{}{}\n{}\n{}\nNOAA 19\n",
            VANGUARD, ISS_NAME, ISS_LINE1, ISS_LINE2
        );
        let f = fixture(
            FakeTransport::default()
                .fail("https://satnogs.test")
                .fail("https://tleapi.test")
                .respond("https://celestrak.org.test", 200, &text),
        );

        assert!(f.acquisition.refresh(25544).await);
        assert_eq!(f.transport.call_count(), 3);

        let slot = f.store.read(25544).unwrap();
        assert_eq!(slot.record, iss());
        assert_eq!(slot.metadata.source, TleSource::Celestrak);
        assert!(f.store.read_record(5).is_none());
    }

    #[tokio::test]
    async fn forbidden_host_falls_through_to_alternate() {
        let text = format!("{}\n{}\n{}\n", ISS_NAME, ISS_LINE1, ISS_LINE2);
        let f = fixture(
            FakeTransport::default()
                .respond("https://satnogs.test", 200, "[]")
                .respond("https://tleapi.test", 404, "")
                .respond("https://celestrak.org.test", 403, "")
                .respond("https://celestrak.com.test", 200, &text),
        );

        assert_eq!(
            f.acquisition.refresh_or_fail(25544).await.unwrap(),
            TleSource::Celestrak
        );
        assert_eq!(f.transport.hosts_called().len(), 4);
    }

    #[tokio::test]
    async fn foreign_records_are_never_committed() {
        let f = fixture(
            FakeTransport::default()
                .respond("https://satnogs.test", 200, &satnogs_body())
                .respond("https://celestrak", 200, VANGUARD),
        );

        assert!(!f.acquisition.refresh(20580).await);
        assert!(!f.store.has_record(20580));
        assert_eq!(f.transport.call_count(), 4);
    }

    #[tokio::test]
    async fn exhaustion_leaves_existing_slot_untouched() {
        let f = fixture(FakeTransport::default());
        f.store.write(25544, &iss(), TleSource::TleApi).unwrap();
        let before = f.store.read(25544).unwrap();

        let err = f.acquisition.refresh_or_fail(25544).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Exhausted { catnr: 25544 }));
        assert_eq!(f.store.read(25544).unwrap(), before);
    }

    #[tokio::test]
    async fn cooldown_blocks_repeat_attempts() {
        let f = fixture(FakeTransport::default().respond("https://satnogs.test", 200, &satnogs_body()));

        assert!(f.acquisition.refresh(25544).await);
        assert!(!f.acquisition.refresh(25544).await);
        assert_eq!(f.transport.call_count(), 1);

        let err = f.acquisition.refresh_or_fail(25544).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::CoolingDown { .. }));

        f.clock.advance(DEFAULT_COOLDOWN);
        assert!(f.acquisition.refresh(25544).await);
        assert_eq!(f.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn failed_attempts_also_start_the_cooldown() {
        let f = fixture(FakeTransport::default());

        assert!(!f.acquisition.refresh(25544).await);
        let contacted = f.transport.call_count();
        assert_eq!(contacted, 4);

        f.clock.advance(Duration::seconds(119));
        assert!(!f.acquisition.refresh(25544).await);
        assert_eq!(f.transport.call_count(), contacted);
        assert!(f.acquisition.ledger().last_attempt(25544).is_some());
    }

    #[tokio::test]
    async fn concurrent_refreshes_let_one_through() {
        let f = fixture(FakeTransport::default().respond("https://satnogs.test", 200, &satnogs_body()));

        let (a, b) = tokio::join!(
            f.acquisition.refresh_outcome(25544),
            f.acquisition.refresh_outcome(25544)
        );
        let refreshed = [&a, &b].iter().filter(|o| o.is_refreshed()).count();
        let skipped = [&a, &b]
            .iter()
            .filter(|o| matches!(o, RefreshOutcome::CoolingDown { .. }))
            .count();
        assert_eq!((refreshed, skipped), (1, 1));
        assert_eq!(f.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn unwritable_store_reports_store_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();
        let clock = Arc::new(FakeClock::at(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(ElementStore::new(blocker, DEFAULT_TTL, clock.clone()));
        let transport = Arc::new(
            FakeTransport::default().respond("https://satnogs.test", 200, &satnogs_body()),
        );
        let acquisition = Acquisition::new(
            store.clone(),
            transport.clone(),
            test_sources(),
            DEFAULT_COOLDOWN,
            DEFAULT_REQUEST_TIMEOUT,
            clock,
        );

        let result = acquisition.refresh_or_fail(25544).await;
        assert!(matches!(
            result,
            Err(AcquisitionError::Store { catnr: 25544, .. })
        ));
        assert_eq!(transport.call_count(), 1);
        assert!(!store.has_record(25544));
    }

    #[test]
    fn ledger_reports_remaining_cooldown() {
        let ledger = RefreshLedger::new(Duration::minutes(2));
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(ledger.try_begin(1, t0).is_ok());
        assert_eq!(
            ledger.try_begin(1, t0 + Duration::seconds(30)),
            Err(Duration::seconds(90))
        );
        assert!(ledger.try_begin(2, t0).is_ok());
        assert!(ledger.try_begin(1, t0 + Duration::minutes(2)).is_ok());
    }
}
