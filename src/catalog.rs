use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Satellites tracked out of the box (key -> NORAD catalog number).
const BUILTIN: &[(&str, u32)] = &[
    ("ISS", 25544),
    ("HST", 20580),
    ("NOAA-20", 43013),
    ("SENTINEL-2A", 40697),
    ("NOAA-15", 25338),
    ("NOAA-19", 33591),
    ("METEOR-M2", 40069),
    ("SENTINEL-1A", 39634),
    ("SUOMI-NPP", 37849),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    pub key: String,
    pub catnr: u32,
}

/// Static key -> catnr mapping, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(key, catnr)| CatalogEntry {
                    key: key.to_string(),
                    catnr: *catnr,
                })
                .collect(),
        )
    }
}

impl Catalog {
    /// Builds a catalog, normalizing keys. Later duplicates of a key are dropped.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut unique: Vec<CatalogEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = normalize_key(&entry.key);
            if unique.iter().any(|e| e.key == key) {
                log::warn!("Duplicate catalog key {} ignored", key);
                continue;
            }
            unique.push(CatalogEntry {
                key,
                catnr: entry.catnr,
            });
        }
        Self { entries: unique }
    }

    pub fn lookup(&self, key: &str) -> Option<&CatalogEntry> {
        let key = normalize_key(key);
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}
