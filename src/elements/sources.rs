use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::error::TransportError;
use super::store::TleSource;
use super::tle::{locate_in_text, placeholder_name, TleRecord};

pub const DEFAULT_USER_AGENT: &str = concat!("orbitwatch/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/json";
const ACCEPT_TEXT: &str = "text/plain,*/*";

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Plain HTTP GET, the only network capability acquisition needs.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        accept: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        accept: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Payload format served by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// SatNOGS DB: JSON array of element objects.
    SatnogsJson,
    /// TLE API: a single JSON object with name/line1/line2.
    TleApiJson,
    /// CelesTrak GP query in plain TLE text.
    CelestrakText,
}

impl SourceKind {
    pub fn tle_source(self) -> TleSource {
        match self {
            SourceKind::SatnogsJson => TleSource::Satnogs,
            SourceKind::TleApiJson => TleSource::TleApi,
            SourceKind::CelestrakText => TleSource::Celestrak,
        }
    }

    fn accept(self) -> &'static str {
        match self {
            SourceKind::SatnogsJson | SourceKind::TleApiJson => ACCEPT_JSON,
            SourceKind::CelestrakText => ACCEPT_TEXT,
        }
    }
}

/// A network source; `{catnr}` in the URL is replaced per request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub url: String,
}

impl SourceConfig {
    pub fn new(kind: SourceKind, url: &str) -> Self {
        Self {
            kind,
            url: url.to_string(),
        }
    }

    pub fn url_for(&self, catnr: u32) -> String {
        self.url.replace("{catnr}", &catnr.to_string())
    }
}

/// Priority order used when the configuration does not list sources.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            SourceKind::SatnogsJson,
            "https://db.satnogs.org/api/tle/?norad_cat_id={catnr}",
        ),
        SourceConfig::new(
            SourceKind::TleApiJson,
            "https://tle.ivanstanojevic.me/api/tle/{catnr}",
        ),
        SourceConfig::new(
            SourceKind::CelestrakText,
            "https://celestrak.org/NORAD/elements/gp.php?CATNR={catnr}&FORMAT=TLE",
        ),
        SourceConfig::new(
            SourceKind::CelestrakText,
            "https://celestrak.com/NORAD/elements/gp.php?CATNR={catnr}&FORMAT=TLE",
        ),
    ]
}

/// Result of asking one source for one catalog number.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Found(TleRecord),
    Unavailable(String),
    Malformed(String),
}

pub async fn fetch_from_source(
    transport: &dyn Transport,
    source: &SourceConfig,
    catnr: u32,
    timeout: Duration,
) -> SourceOutcome {
    let url = source.url_for(catnr);
    let response = match transport.get(&url, source.kind.accept(), timeout).await {
        Ok(response) => response,
        Err(e) => return SourceOutcome::Unavailable(e.to_string()),
    };

    if response.status == 403 {
        return SourceOutcome::Unavailable(format!("{} answered 403 Forbidden", url));
    }
    if !response.is_success() {
        return SourceOutcome::Unavailable(format!("{} answered {}", url, response.status));
    }

    let parsed = match source.kind {
        SourceKind::SatnogsJson => parse_satnogs(&response.body, catnr),
        SourceKind::TleApiJson => parse_tle_api(&response.body, catnr),
        SourceKind::CelestrakText => locate_in_text(&response.body, catnr)
            .ok_or_else(|| format!("no element set for CATNR={} in response", catnr)),
    };

    match parsed {
        Ok(record) => SourceOutcome::Found(record),
        Err(reason) => SourceOutcome::Malformed(reason),
    }
}

/// SatNOGS returns a list; the first entry wins. Field layouts seen in the
/// wild: `tle0/tle1/tle2`, `tle1/tle2` only, or `tle` holding both lines.
pub fn parse_satnogs(body: &str, catnr: u32) -> Result<TleRecord, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let item = value
        .as_array()
        .and_then(|items| items.first())
        .ok_or("empty or non-list response")?;

    let field = |name: &str| item.get(name).and_then(Value::as_str).map(str::trim);
    let is_element_line = |line: &str| line.starts_with("1 ") || line.starts_with("2 ");

    let (line1, line2) = match (field("tle0"), field("tle1"), field("tle2"), field("tle")) {
        (_, Some(l1), Some(l2), _) => (l1.to_string(), l2.to_string()),
        (Some(l0), Some(l1), None, _) if is_element_line(l0) => (l0.to_string(), l1.to_string()),
        (_, _, _, Some(text)) => {
            let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
            match (lines.next(), lines.next()) {
                (Some(l1), Some(l2)) => (l1.to_string(), l2.to_string()),
                _ => return Err("'tle' field holds fewer than 2 lines".into()),
            }
        }
        _ => return Err("no element lines in response".into()),
    };

    let name = item
        .get("satellite")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            field("tle0")
                .filter(|l0| !is_element_line(l0))
                .map(|l0| l0.trim_start_matches("0 ").to_string())
        })
        .unwrap_or_else(|| placeholder_name(catnr));

    TleRecord::new(name, line1, line2, catnr).map_err(|e| e.to_string())
}

#[derive(Deserialize)]
struct TleApiItem {
    name: Option<String>,
    line1: Option<String>,
    line2: Option<String>,
}

pub fn parse_tle_api(body: &str, catnr: u32) -> Result<TleRecord, String> {
    let item: TleApiItem = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let (Some(line1), Some(line2)) = (item.line1, item.line2) else {
        return Err("response is missing line1/line2".into());
    };
    let name = item
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| placeholder_name(catnr));

    TleRecord::new(name, line1, line2, catnr).map_err(|e| e.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::elements::tle::tests::{iss, ISS_LINE1, ISS_LINE2, ISS_NAME};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted transport: answers by URL prefix and records every request.
    #[derive(Default)]
    pub struct FakeTransport {
        routes: Vec<(String, Result<HttpResponse, String>)>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn respond(mut self, prefix: &str, status: u16, body: &str) -> Self {
            self.routes.push((
                prefix.to_string(),
                Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
            ));
            self
        }

        pub fn fail(mut self, prefix: &str) -> Self {
            self.routes
                .push((prefix.to_string(), Err("connection refused".to_string())));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn hosts_called(&self) -> HashMap<String, usize> {
            let mut hosts = HashMap::new();
            for url in self.calls.lock().unwrap().iter() {
                let host = url.split('/').nth(2).unwrap_or_default().to_string();
                *hosts.entry(host).or_insert(0) += 1;
            }
            hosts
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(
            &self,
            url: &str,
            _accept: &str,
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.routes.iter().find(|(prefix, _)| url.starts_with(prefix)) {
                Some((_, Ok(response))) => Ok(response.clone()),
                Some((_, Err(e))) => Err(TransportError(e.clone())),
                None => Err(TransportError(format!("no route for {}", url))),
            }
        }
    }

    pub fn satnogs_body() -> String {
        json!([{
            "tle0": format!("0 {}", ISS_NAME),
            "tle1": ISS_LINE1,
            "tle2": ISS_LINE2,
            "norad_cat_id": 25544,
        }])
        .to_string()
    }

    #[test]
    fn satnogs_three_field_layout() {
        let record = parse_satnogs(&satnogs_body(), 25544).unwrap();
        assert_eq!(record, iss());
    }

    #[test]
    fn satnogs_prefers_embedded_satellite_name() {
        let body = json!([{
            "satellite": { "name": "ISS" },
            "tle": format!("{}\n{}\n", ISS_LINE1, ISS_LINE2),
        }])
        .to_string();
        let record = parse_satnogs(&body, 25544).unwrap();
        assert_eq!(record.name, "ISS");
        assert_eq!(record.line1, ISS_LINE1);
    }

    #[test]
    fn satnogs_two_field_layout_uses_placeholder_name() {
        let body = json!([{ "tle0": ISS_LINE1, "tle1": ISS_LINE2 }]).to_string();
        let record = parse_satnogs(&body, 25544).unwrap();
        assert_eq!(record.name, "CATNR 25544");
        assert_eq!(record.line2, ISS_LINE2);
    }

    #[test]
    fn satnogs_rejects_empty_and_foreign_records() {
        assert!(parse_satnogs("[]", 25544).is_err());
        assert!(parse_satnogs("{}", 25544).is_err());
        assert!(parse_satnogs(&satnogs_body(), 20580).is_err());
    }

    #[test]
    fn tle_api_object() {
        let body = json!({ "name": ISS_NAME, "line1": ISS_LINE1, "line2": ISS_LINE2 }).to_string();
        assert_eq!(parse_tle_api(&body, 25544).unwrap(), iss());

        let missing = json!({ "name": ISS_NAME, "line1": ISS_LINE1 }).to_string();
        assert!(parse_tle_api(&missing, 25544).is_err());
    }

    #[tokio::test]
    async fn forbidden_and_errors_are_unavailable() {
        let transport = FakeTransport::default()
            .respond("https://a.test", 403, "")
            .respond("https://b.test", 500, "")
            .fail("https://c.test");
        let timeout = Duration::from_secs(1);

        for host in ["https://a.test/{catnr}", "https://b.test/{catnr}", "https://c.test/{catnr}"] {
            let source = SourceConfig::new(SourceKind::CelestrakText, host);
            let outcome = fetch_from_source(&transport, &source, 25544, timeout).await;
            assert!(matches!(outcome, SourceOutcome::Unavailable(_)), "{host}");
        }
        assert_eq!(
            transport.calls.lock().unwrap()[0],
            "https://a.test/25544".to_string()
        );
    }

    #[tokio::test]
    async fn unparsable_payload_is_malformed() {
        let transport = FakeTransport::default().respond("https://a.test", 200, "<html></html>");
        let source = SourceConfig::new(SourceKind::SatnogsJson, "https://a.test/{catnr}");
        let outcome =
            fetch_from_source(&transport, &source, 25544, Duration::from_secs(1)).await;
        assert!(matches!(outcome, SourceOutcome::Malformed(_)));
    }
}
