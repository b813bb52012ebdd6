use chrono::Duration;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{Catalog, CatalogEntry};
use crate::elements::{
    default_sources, Acquisition, Clock, ElementStore, ReqwestTransport, SourceConfig,
    SystemClock, TransportError, DEFAULT_USER_AGENT,
};
use crate::orbit::{Observer, OrbitEngine, Sgp4Propagator};
use crate::service::Service;
use crate::time::LocalZone;

pub const DISABLE_REFRESH_ENV: &str = "DISABLE_TLE_REFRESH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid duration for {field}: {reason}")]
    Duration { field: &'static str, reason: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("HTTP client setup failed: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub observer: ObserverConfig,
    pub elements: ElementsConfig,
    pub display: DisplayConfig,
    pub web: WebConfig,
    pub catalog: Option<Vec<CatalogEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub name: Option<String>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        let observer = Observer::default();
        Self {
            name: Some("Montevideo".to_string()),
            latitude_deg: observer.latitude_deg,
            longitude_deg: observer.longitude_deg,
            altitude_m: observer.altitude_m,
        }
    }
}

impl ObserverConfig {
    pub fn observer(&self) -> Result<Observer, ConfigError> {
        if !(-90.0..=90.0).contains(&self.latitude_deg)
            || !(-180.0..=180.0).contains(&self.longitude_deg)
        {
            return Err(ConfigError::Invalid(format!(
                "observer coordinates out of range: {}, {}",
                self.latitude_deg, self.longitude_deg
            )));
        }
        Ok(Observer {
            latitude_deg: self.latitude_deg,
            longitude_deg: self.longitude_deg,
            altitude_m: self.altitude_m,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    pub data_dir: PathBuf,
    pub ttl: String,
    pub refresh_cooldown: String,
    pub request_timeout: String,
    pub startup_refresh: bool,
    pub user_agent: String,
    pub sources: Vec<SourceConfig>,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            ttl: "6h".to_string(),
            refresh_cooldown: "2m".to_string(),
            request_timeout: "10s".to_string(),
            startup_refresh: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sources: default_sources(),
        }
    }
}

impl ElementsConfig {
    pub fn ttl(&self) -> Result<Duration, ConfigError> {
        parse_duration("elements.ttl", &self.ttl)
    }

    pub fn refresh_cooldown(&self) -> Result<Duration, ConfigError> {
        parse_duration("elements.refresh_cooldown", &self.refresh_cooldown)
    }

    pub fn request_timeout(&self) -> Result<std::time::Duration, ConfigError> {
        humantime::parse_duration(self.request_timeout.trim()).map_err(|e| {
            ConfigError::Duration {
                field: "elements.request_timeout",
                reason: e.to_string(),
            }
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub utc_offset_hours: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: -3.0,
        }
    }
}

impl DisplayConfig {
    pub fn zone(&self) -> Result<LocalZone, ConfigError> {
        LocalZone::from_hours(self.utc_offset_hours).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
    /// Allowed CORS origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Config file if given, defaults otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Config::default()),
        }
    }

    pub fn catalog(&self) -> Catalog {
        match &self.catalog {
            Some(entries) if !entries.is_empty() => Catalog::new(entries.clone()),
            _ => Catalog::default(),
        }
    }

    /// Startup refresh runs unless disabled here or through the environment.
    pub fn startup_refresh_enabled(&self) -> bool {
        let disabled = std::env::var(DISABLE_REFRESH_ENV)
            .map(|v| v.trim() == "1")
            .unwrap_or(false);
        self.elements.startup_refresh && !disabled
    }

    pub fn build_service(&self, allow_network: bool) -> Result<Service, ConfigError> {
        self.build_service_with_clock(allow_network, Arc::new(SystemClock))
    }

    pub fn build_service_with_clock(
        &self,
        allow_network: bool,
        clock: Arc<dyn Clock>,
    ) -> Result<Service, ConfigError> {
        let sources = if self.elements.sources.is_empty() {
            default_sources()
        } else {
            self.elements.sources.clone()
        };

        let store = Arc::new(ElementStore::new(
            self.elements.data_dir.clone(),
            self.elements.ttl()?,
            clock.clone(),
        ));
        let transport = Arc::new(ReqwestTransport::new(&self.elements.user_agent)?);
        let acquisition = Arc::new(Acquisition::new(
            store.clone(),
            transport,
            sources,
            self.elements.refresh_cooldown()?,
            self.elements.request_timeout()?,
            clock.clone(),
        ));
        let engine = OrbitEngine::new(Arc::new(Sgp4Propagator), self.display.zone()?, clock);

        Ok(Service::new(
            Arc::new(self.catalog()),
            store,
            acquisition,
            engine,
            self.observer.observer()?,
            allow_network,
        ))
    }
}

fn parse_duration(field: &'static str, s: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
        .map_err(|reason| ConfigError::Duration { field, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::SourceKind;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.elements.ttl().unwrap(), Duration::hours(6));
        assert_eq!(config.elements.refresh_cooldown().unwrap(), Duration::minutes(2));
        assert_eq!(
            config.elements.request_timeout().unwrap(),
            std::time::Duration::from_secs(10)
        );
        assert_eq!(config.elements.sources, default_sources());
        assert_eq!(config.web.bind, "0.0.0.0:8000");
        assert_eq!(config.observer.observer().unwrap(), Observer::default());
        assert_eq!(config.display.zone().unwrap(), LocalZone::default());
        assert_eq!(config.catalog().entries().len(), 9);
    }

    #[test]
    fn parses_full_file() {
        let yaml = r#"
observer:
  name: Cordoba
  latitude_deg: -31.4
  longitude_deg: -64.2
  altitude_m: 400
elements:
  data_dir: /var/lib/orbitwatch
  ttl: 12h
  refresh_cooldown: 30s
  request_timeout: 5s
  startup_refresh: false
  sources:
    - kind: celestrak_text
      url: "https://mirror.test/gp?CATNR={catnr}"
display:
  utc_offset_hours: 0
web:
  bind: 127.0.0.1:9000
  cors_origins: ["http://localhost:5173"]
catalog:
  - key: iss
    catnr: 25544
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.elements.ttl().unwrap(), Duration::hours(12));
        assert_eq!(config.elements.refresh_cooldown().unwrap(), Duration::seconds(30));
        assert_eq!(config.elements.sources.len(), 1);
        assert_eq!(config.elements.sources[0].kind, SourceKind::CelestrakText);
        assert!(!config.startup_refresh_enabled());
        assert_eq!(config.observer.observer().unwrap().altitude_m, 400.0);
        assert_eq!(config.display.zone().unwrap().offset().local_minus_utc(), 0);
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);

        let catalog = config.catalog();
        assert_eq!(catalog.keys(), vec!["ISS"]);
    }

    #[test]
    fn rejects_bad_values() {
        let config = Config::from_yaml("elements:\n  ttl: soon\n").unwrap();
        assert!(matches!(
            config.elements.ttl(),
            Err(ConfigError::Duration { field: "elements.ttl", .. })
        ));

        let config = Config::from_yaml("observer:\n  latitude_deg: 95\n").unwrap();
        assert!(config.observer.observer().is_err());

        let config = Config::from_yaml("display:\n  utc_offset_hours: 30\n").unwrap();
        assert!(config.display.zone().is_err());

        assert!(Config::from_yaml("web: [1, 2]").is_err());
    }

    #[tokio::test]
    async fn builds_an_offline_service() {
        let dir = tempfile::TempDir::new().unwrap();
        let yaml = format!("elements:\n  data_dir: {}\n", dir.path().display());
        let config = Config::from_yaml(&yaml).unwrap();
        let service = config.build_service(false).unwrap();
        assert_eq!(service.status_all().len(), 9);
        assert!(service.status_all().iter().all(|s| !s.status.has_local));

        let results = service.refresh_all().await;
        assert!(results.iter().all(|r| !r.refreshed));
    }
}
