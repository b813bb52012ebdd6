use std::sync::Arc;

use crate::catalog::{normalize_key, Catalog, CatalogEntry};
use crate::elements::{Acquisition, ElementStore};
use crate::error::ServiceError;
use crate::orbit::SatelliteHandle;

/// Turns a satellite key into a handle built from locally stored elements,
/// refreshing them first when they are stale and the network is allowed.
pub struct Resolver {
    catalog: Arc<Catalog>,
    store: Arc<ElementStore>,
    acquisition: Arc<Acquisition>,
}

impl Resolver {
    pub fn new(catalog: Arc<Catalog>, store: Arc<ElementStore>, acquisition: Arc<Acquisition>) -> Self {
        Self {
            catalog,
            store,
            acquisition,
        }
    }

    pub fn entry(&self, key: &str) -> Result<&CatalogEntry, ServiceError> {
        self.catalog
            .lookup(key)
            .ok_or_else(|| ServiceError::InvalidSatellite {
                key: normalize_key(key),
                options: self.catalog.keys(),
            })
    }

    pub async fn resolve(
        &self,
        key: &str,
        allow_network: bool,
    ) -> Result<SatelliteHandle, ServiceError> {
        let entry = self.entry(key)?;
        let catnr = entry.catnr;

        if allow_network && self.store.is_stale(catnr) {
            // Best effort; whatever is on disk afterwards is used.
            self.acquisition.refresh(catnr).await;
        }

        let no_elements = || ServiceError::NoLocalElements {
            key: entry.key.clone(),
            path: self.store.tle_path(catnr),
        };

        let record = self.store.read_record(catnr).ok_or_else(no_elements)?;
        SatelliteHandle::from_record(&entry.key, catnr, &record).map_err(|e| {
            log::warn!("Stored elements for {} are unusable: {}", entry.key, e);
            no_elements()
        })
    }
}
