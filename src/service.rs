use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::catalog::{Catalog, CatalogEntry};
use crate::elements::{Acquisition, ElementStatus, ElementStore, TleMetadata, TleSource};
use crate::error::{ServiceError, ServiceResult};
use crate::orbit::{
    Observer, OrbitEngine, PassReport, PositionReport, SatelliteHandle, SatelliteRef, TrackReport,
};
use crate::resolver::Resolver;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SatelliteStatus {
    pub key: String,
    #[serde(flatten)]
    pub status: ElementStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RefreshResult {
    pub key: String,
    pub catnr: u32,
    pub refreshed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetaReport {
    pub satellite: SatelliteRef,
    pub meta: Option<TleMetadata>,
}

/// Everything the CLI and HTTP layer call into.
pub struct Service {
    catalog: Arc<Catalog>,
    store: Arc<ElementStore>,
    acquisition: Arc<Acquisition>,
    resolver: Resolver,
    engine: OrbitEngine,
    observer: Observer,
    allow_network: bool,
}

impl Service {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<ElementStore>,
        acquisition: Arc<Acquisition>,
        engine: OrbitEngine,
        observer: Observer,
        allow_network: bool,
    ) -> Self {
        let resolver = Resolver::new(catalog.clone(), store.clone(), acquisition.clone());
        Self {
            catalog,
            store,
            acquisition,
            resolver,
            engine,
            observer,
            allow_network,
        }
    }

    pub fn catalog_entry(&self, key: &str) -> ServiceResult<CatalogEntry> {
        self.resolver.entry(key).cloned()
    }

    pub async fn resolve_satellite(&self, key: &str) -> ServiceResult<SatelliteHandle> {
        self.resolver.resolve(key, self.allow_network).await
    }

    pub async fn current_position(&self, key: &str) -> ServiceResult<PositionReport> {
        let sat = self.resolve_satellite(key).await?;
        Ok(self.engine.current_position(&sat)?)
    }

    pub async fn ground_track(
        &self,
        key: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_seconds: u32,
    ) -> ServiceResult<TrackReport> {
        let sat = self.resolve_satellite(key).await?;
        Ok(self.engine.ground_track(&sat, start, end, step_seconds)?)
    }

    pub async fn ground_track_now(
        &self,
        key: &str,
        minutes: u32,
        step_seconds: u32,
    ) -> ServiceResult<TrackReport> {
        let sat = self.resolve_satellite(key).await?;
        Ok(self.engine.ground_track_now(&sat, minutes, step_seconds)?)
    }

    pub async fn visibility_passes(
        &self,
        key: &str,
        hours: u32,
        min_elevation_deg: f64,
        start: Option<DateTime<Utc>>,
    ) -> ServiceResult<PassReport> {
        let sat = self.resolve_satellite(key).await?;
        Ok(self.engine.visibility_passes(
            &sat,
            &self.observer,
            hours,
            min_elevation_deg,
            start,
        )?)
    }

    /// Best-effort refresh of one satellite's elements. Offline it reports
    /// `refreshed: false` without contacting any source.
    pub async fn refresh(&self, key: &str) -> ServiceResult<RefreshResult> {
        let entry = self.resolver.entry(key)?;
        let refreshed = self.refresh_entry(entry).await;
        Ok(refresh_result(entry, refreshed))
    }

    /// Refresh that must succeed; exhaustion is an error, and so is being
    /// offline.
    pub async fn refresh_or_fail(&self, key: &str) -> ServiceResult<TleSource> {
        let entry = self.resolver.entry(key)?;
        if !self.allow_network {
            log::warn!("Refusing to fetch elements for {} (offline)", entry.key);
            return Err(ServiceError::AcquisitionExhausted { catnr: entry.catnr });
        }
        Ok(self.acquisition.refresh_or_fail(entry.catnr).await?)
    }

    pub async fn refresh_all(&self) -> Vec<RefreshResult> {
        let mut results = Vec::with_capacity(self.catalog.entries().len());
        for entry in self.catalog.entries() {
            let refreshed = self.refresh_entry(entry).await;
            results.push(refresh_result(entry, refreshed));
        }
        results
    }

    pub fn element_status(&self, key: &str) -> ServiceResult<SatelliteStatus> {
        let entry = self.resolver.entry(key)?;
        Ok(self.status_of(entry))
    }

    pub fn status_all(&self) -> Vec<SatelliteStatus> {
        self.catalog
            .entries()
            .iter()
            .map(|entry| self.status_of(entry))
            .collect()
    }

    /// Catalog entries with their element status.
    pub fn satellites(&self) -> Vec<SatelliteStatus> {
        self.status_all()
    }

    pub fn element_meta(&self, key: &str) -> ServiceResult<MetaReport> {
        let entry = self.resolver.entry(key)?;
        Ok(MetaReport {
            satellite: SatelliteRef {
                key: entry.key.clone(),
                catnr: entry.catnr,
            },
            meta: self.store.metadata(entry.catnr),
        })
    }

    /// One pass over the catalog refreshing stale entries. Failures are
    /// logged and never abort.
    pub async fn startup_refresh(&self) {
        if !self.allow_network {
            log::info!("Startup element refresh skipped (offline)");
            return;
        }

        for entry in self.catalog.entries() {
            if !self.store.is_stale(entry.catnr) {
                log::info!("Startup: {} ({}) elements fresh", entry.key, entry.catnr);
                continue;
            }
            if self.acquisition.refresh(entry.catnr).await {
                log::info!("Startup: {} ({}) refreshed", entry.key, entry.catnr);
            } else {
                log::warn!(
                    "Startup: {} ({}) could not be refreshed",
                    entry.key,
                    entry.catnr
                );
            }
        }
    }

    async fn refresh_entry(&self, entry: &CatalogEntry) -> bool {
        if !self.allow_network {
            log::debug!("Skipping refresh of {} (offline)", entry.key);
            return false;
        }
        self.acquisition.refresh(entry.catnr).await
    }

    fn status_of(&self, entry: &CatalogEntry) -> SatelliteStatus {
        SatelliteStatus {
            key: entry.key.clone(),
            status: self.store.status(entry.catnr),
        }
    }
}

fn refresh_result(entry: &CatalogEntry, refreshed: bool) -> RefreshResult {
    RefreshResult {
        key: entry.key.clone(),
        catnr: entry.catnr,
        refreshed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::testing::{iss, satnogs_body, FakeClock, FakeTransport};
    use crate::elements::{
        SourceConfig, SourceKind, DEFAULT_COOLDOWN, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TTL,
    };
    use crate::orbit::Sgp4Propagator;
    use crate::time::LocalZone;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        clock: Arc<FakeClock>,
        store: Arc<ElementStore>,
        transport: Arc<FakeTransport>,
        service: Service,
    }

    /// ISS element epoch.
    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2008, 9, 20, 12, 25, 40).unwrap()
    }

    fn fixture(transport: FakeTransport, allow_network: bool) -> Fixture {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FakeClock::at(epoch()));
        let store = Arc::new(ElementStore::new(
            dir.path().to_path_buf(),
            DEFAULT_TTL,
            clock.clone(),
        ));
        let transport = Arc::new(transport);
        let acquisition = Arc::new(Acquisition::new(
            store.clone(),
            transport.clone(),
            vec![SourceConfig::new(
                SourceKind::SatnogsJson,
                "https://satnogs.test/{catnr}",
            )],
            DEFAULT_COOLDOWN,
            DEFAULT_REQUEST_TIMEOUT,
            clock.clone(),
        ));
        let engine = OrbitEngine::new(
            Arc::new(Sgp4Propagator),
            LocalZone::default(),
            clock.clone(),
        );
        let service = Service::new(
            Arc::new(Catalog::default()),
            store.clone(),
            acquisition,
            engine,
            Observer::default(),
            allow_network,
        );
        Fixture {
            _dir: dir,
            clock,
            store,
            transport,
            service,
        }
    }

    #[tokio::test]
    async fn passes_end_to_end() {
        let f = fixture(FakeTransport::default(), false);
        f.store.write(25544, &iss(), TleSource::Satnogs).unwrap();

        let report = f
            .service
            .visibility_passes("iss", 24, 10.0, None)
            .await
            .unwrap();

        assert_eq!(report.satellite.key, "ISS");
        assert_eq!(report.start_utc, epoch());
        assert_eq!(report.end_utc, epoch() + Duration::hours(24));
        for pass in &report.passes {
            assert!(pass.rise_utc < pass.culmination_utc);
            assert!(pass.culmination_utc < pass.set_utc);
            assert!(pass.max_elevation_deg >= 10.0);
            assert!(pass.rise_utc >= report.start_utc && pass.set_utc <= report.end_utc);
        }
    }

    #[tokio::test]
    async fn position_and_track_use_stored_elements() {
        let f = fixture(FakeTransport::default(), false);
        f.store.write(25544, &iss(), TleSource::Satnogs).unwrap();

        let position = f.service.current_position("ISS").await.unwrap();
        assert_eq!(position.t_utc, epoch());
        assert!(position.position.alt_km > 300.0);

        let track = f.service.ground_track_now("ISS", 10, 60).await.unwrap();
        assert_eq!(track.points.len(), 11);
        assert_eq!(track.geojson.geometry.coordinates.len(), 11);
    }

    #[tokio::test]
    async fn invalid_parameters_are_rejected() {
        let f = fixture(FakeTransport::default(), false);
        f.store.write(25544, &iss(), TleSource::Satnogs).unwrap();

        let result = f.service.ground_track("ISS", epoch(), epoch(), 10).await;
        assert!(matches!(result, Err(ServiceError::InvalidTimeRange(_))));
        let result = f.service.visibility_passes("ISS", 500, 10.0, None).await;
        assert!(matches!(result, Err(ServiceError::InvalidTimeRange(_))));
        let result = f.service.current_position("nope").await;
        assert!(matches!(result, Err(ServiceError::InvalidSatellite { .. })));
    }

    #[tokio::test]
    async fn refresh_or_fail_reports_exhaustion() {
        let f = fixture(FakeTransport::default().fail("https://satnogs.test"), true);
        let result = f.service.refresh_or_fail("ISS").await;
        assert!(matches!(
            result,
            Err(ServiceError::AcquisitionExhausted { catnr: 25544 })
        ));

        // Inside the cooldown it is still reported as exhausted, without a request.
        let again = f.service.refresh_or_fail("ISS").await;
        assert!(matches!(
            again,
            Err(ServiceError::AcquisitionExhausted { catnr: 25544 })
        ));
        assert_eq!(f.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn refresh_all_and_status() {
        let f = fixture(
            FakeTransport::default().respond("https://satnogs.test/25544", 200, &satnogs_body()),
            true,
        );

        let results = f.service.refresh_all().await;
        assert_eq!(results.len(), Catalog::default().entries().len());
        let refreshed: Vec<_> = results.iter().filter(|r| r.refreshed).collect();
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].key, "ISS");

        f.clock.advance(Duration::minutes(30));
        let status = f.service.element_status("iss").unwrap();
        assert_eq!(status.key, "ISS");
        assert!(status.status.has_local);
        assert!(!status.status.stale);
        assert_eq!(status.status.age_seconds, Some(1800));
        assert_eq!(status.status.source, Some(TleSource::Satnogs));

        let all = f.service.status_all();
        assert_eq!(all.iter().filter(|s| s.status.has_local).count(), 1);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["key"], "ISS");
        assert_eq!(json["age_minutes"], 30.0);

        let meta = f.service.element_meta("ISS").unwrap();
        assert_eq!(meta.meta.map(|m| m.source), Some(TleSource::Satnogs));
        assert!(f.service.element_meta("NOAA-19").unwrap().meta.is_none());
    }

    #[tokio::test]
    async fn startup_refresh_only_touches_stale_entries() {
        let f = fixture(FakeTransport::default(), true);
        f.store.write(25544, &iss(), TleSource::Celestrak).unwrap();

        f.service.startup_refresh().await;
        let hosts = f.transport.calls.lock().unwrap().clone();
        assert_eq!(hosts.len(), Catalog::default().entries().len() - 1);
        assert!(!hosts.iter().any(|url| url.ends_with("/25544")));
    }

    #[tokio::test]
    async fn offline_service_never_fetches() {
        let f = fixture(
            FakeTransport::default().respond("https://satnogs.test", 200, &satnogs_body()),
            false,
        );
        f.service.startup_refresh().await;
        let result = f.service.current_position("ISS").await;
        assert!(matches!(result, Err(ServiceError::NoLocalElements { .. })));
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn offline_refresh_never_contacts_sources() {
        let f = fixture(
            FakeTransport::default().respond("https://satnogs.test", 200, &satnogs_body()),
            false,
        );

        let results = f.service.refresh_all().await;
        assert_eq!(results.len(), Catalog::default().entries().len());
        assert!(results.iter().all(|r| !r.refreshed));

        let single = f.service.refresh("ISS").await.unwrap();
        assert_eq!(single.catnr, 25544);
        assert!(!single.refreshed);

        let forced = f.service.refresh_or_fail("ISS").await;
        assert!(matches!(
            forced,
            Err(ServiceError::AcquisitionExhausted { catnr: 25544 })
        ));
        assert!(matches!(
            f.service.refresh("nope").await,
            Err(ServiceError::InvalidSatellite { .. })
        ));

        assert_eq!(f.transport.call_count(), 0);
        assert!(!f.store.has_record(25544));
    }

    #[tokio::test]
    async fn best_effort_refresh_reports_outcome() {
        let f = fixture(
            FakeTransport::default().respond("https://satnogs.test/25544", 200, &satnogs_body()),
            true,
        );

        let result = f.service.refresh("iss").await.unwrap();
        assert_eq!(
            result,
            RefreshResult {
                key: "ISS".into(),
                catnr: 25544,
                refreshed: true,
            }
        );
        assert!(f.store.has_record(25544));

        let noaa = f.service.refresh("NOAA-19").await.unwrap();
        assert!(!noaa.refreshed);
    }
}
