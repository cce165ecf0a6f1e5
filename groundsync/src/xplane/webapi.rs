//! Client for the X-Plane 12 local web API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::connection::{ConnectionError, ConnectionStep, ConnectionSteps};
use crate::variables::{BackendError, VarValue, VariableBackend};

/// Default port of the web API.
pub const DEFAULT_WEB_API_PORT: u16 = 8086;

/// Variable that only resolves once an aircraft is loaded.
pub const DEFAULT_AIRCRAFT_PROBE: &str = "sim/aircraft/view/acf_ICAO";

/// Variable that turns truthy once the session is running.
pub const DEFAULT_SESSION_READY: &str = "sim/operation/prefs/startup_running";

/// Web API connection settings.
#[derive(Debug, Clone)]
pub struct WebApiConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    /// Timeout of the plain TCP probe used to detect the simulator.
    pub probe_timeout: Duration,
    pub aircraft_probe: String,
    pub session_ready: String,
    pub session_timeout: Duration,
    pub session_poll: Duration,
}

impl Default for WebApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_WEB_API_PORT,
            request_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
            aircraft_probe: DEFAULT_AIRCRAFT_PROBE.to_string(),
            session_ready: DEFAULT_SESSION_READY.to_string(),
            session_timeout: Duration::from_secs(120),
            session_poll: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Capabilities {
    api: ApiVersions,
}

#[derive(Debug, Deserialize)]
struct ApiVersions {
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DatarefList {
    data: Vec<DatarefInfo>,
}

#[derive(Debug, Deserialize)]
struct DatarefInfo {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ValueEnvelope {
    data: serde_json::Value,
}

/// Split `name[3]` into `("name", Some(3))`.
///
/// Anything that is not a well-formed trailing index is returned unchanged.
pub fn split_index(name: &str) -> (&str, Option<usize>) {
    if let Some(body) = name.strip_suffix(']') {
        if let Some(open) = body.rfind('[') {
            if let Ok(index) = body[open + 1..].parse::<usize>() {
                return (&body[..open], Some(index));
            }
        }
    }
    (name, None)
}

/// Variable backend and connection steps over the web API.
///
/// Names resolve to numeric ids once per connection; [`ConnectionSteps::reset`]
/// drops the cache so a reloaded aircraft is looked up again. Clones share
/// the cache and the connection flag.
#[derive(Clone)]
pub struct WebApiClient {
    http: reqwest::Client,
    base_url: String,
    config: WebApiConfig,
    ids: Arc<Mutex<HashMap<String, u64>>>,
    connected: Arc<AtomicBool>,
}

impl WebApiClient {
    pub fn new(config: WebApiConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: format!("http://{}:{}", config.host, config.port),
            config,
            ids: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &WebApiConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of cached name lookups.
    pub fn cached_ids(&self) -> usize {
        self.ids.lock().len()
    }

    fn ensure_connected(&self) -> Result<(), BackendError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BackendError::NotConnected)
        }
    }

    fn value_url(&self, id: u64) -> String {
        format!("{}/api/v2/datarefs/{}/value", self.base_url, id)
    }

    async fn capabilities(&self) -> Result<Capabilities, String> {
        let url = format!("{}/api/capabilities", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status().as_u16()));
        }
        response
            .json::<Capabilities>()
            .await
            .map_err(|e| format!("bad capabilities: {}", e))
    }

    async fn resolve(&self, name: &str) -> Result<u64, BackendError> {
        if let Some(id) = self.ids.lock().get(name).copied() {
            return Ok(id);
        }

        let url = format!("{}/api/v2/datarefs", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("filter[name]", name)])
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "lookup of '{}' returned status {}",
                name,
                response.status().as_u16()
            )));
        }
        let list: DatarefList = response.json().await.map_err(|e| BackendError::Format {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let id = list
            .data
            .first()
            .map(|info| info.id)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;

        trace!(name = name, id = id, "Resolved variable id");
        self.ids.lock().insert(name.to_string(), id);
        Ok(id)
    }
}

#[async_trait]
impl VariableBackend for WebApiClient {
    async fn read(&self, name: &str) -> Result<VarValue, BackendError> {
        self.ensure_connected()?;
        let (base, index) = split_index(name);
        let id = self.resolve(base).await?;

        let mut request = self.http.get(self.value_url(id));
        if let Some(index) = index {
            request = request.query(&[("index", index)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "read of '{}' returned status {}",
                name,
                response.status().as_u16()
            )));
        }
        let envelope: ValueEnvelope = response.json().await.map_err(|e| BackendError::Format {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        VarValue::from_json(&envelope.data).ok_or_else(|| BackendError::Format {
            name: name.to_string(),
            reason: format!("unsupported value {}", envelope.data),
        })
    }

    async fn write(&self, name: &str, value: VarValue) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let (base, index) = split_index(name);
        let id = self.resolve(base).await?;

        let mut request = self
            .http
            .patch(self.value_url(id))
            .json(&serde_json::json!({ "data": value.to_json() }));
        if let Some(index) = index {
            request = request.query(&[("index", index)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        match response.status().as_u16() {
            200..=299 => {
                debug!(name = name, value = %value, "Wrote variable");
                Ok(())
            }
            403 => Err(BackendError::ReadOnly(name.to_string())),
            status => Err(BackendError::Transport(format!(
                "write of '{}' returned status {}",
                name, status
            ))),
        }
    }
}

impl ConnectionSteps for WebApiClient {
    async fn simulator_running(&self) -> bool {
        let addr = (self.config.host.as_str(), self.config.port);
        matches!(
            tokio::time::timeout(self.config.probe_timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    async fn connect_transport(&self) -> Result<(), ConnectionError> {
        let capabilities = self
            .capabilities()
            .await
            .map_err(|reason| ConnectionError::StepFailed {
                step: ConnectionStep::Transport,
                reason,
            })?;
        if !capabilities.api.versions.iter().any(|v| v == "v2") {
            return Err(ConnectionError::StepFailed {
                step: ConnectionStep::Transport,
                reason: format!("web API v2 not offered ({:?})", capabilities.api.versions),
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn connect_aircraft(&self) -> Result<(), ConnectionError> {
        self.read(&self.config.aircraft_probe)
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::StepFailed {
                step: ConnectionStep::AircraftBackend,
                reason: e.to_string(),
            })
    }

    async fn wait_session_ready(&self) -> Result<(), ConnectionError> {
        let deadline = tokio::time::Instant::now() + self.config.session_timeout;
        loop {
            match self.read(&self.config.session_ready).await {
                Ok(value) if value.as_bool() => return Ok(()),
                Ok(_) => {}
                Err(e) => trace!(error = %e, "Session readiness read failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    timeout_secs = self.config.session_timeout.as_secs(),
                    "Session did not become ready"
                );
                return Err(ConnectionError::Timeout(ConnectionStep::SessionReady));
            }
            tokio::time::sleep(self.config.session_poll).await;
        }
    }

    async fn transport_healthy(&self) -> bool {
        self.capabilities().await.is_ok()
    }

    async fn reset(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.ids.lock().clear();
        debug!("Web API client reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_index() {
        assert_eq!(split_index("aircraft.payload.seats[12]"), ("aircraft.payload.seats", Some(12)));
        assert_eq!(split_index("sim/flightmodel/weight/m_fuel_total"), ("sim/flightmodel/weight/m_fuel_total", None));
        assert_eq!(split_index("odd[x]"), ("odd[x]", None));
        assert_eq!(split_index("open["), ("open[", None));
    }

    #[test]
    fn test_base_url_from_config() {
        let client = WebApiClient::new(WebApiConfig {
            host: "10.0.0.2".to_string(),
            port: 9000,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.2:9000");
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_reads_require_connection() {
        let client = WebApiClient::new(WebApiConfig::default()).unwrap();
        assert!(matches!(
            client.read("sim/time/paused").await,
            Err(BackendError::NotConnected)
        ));
        assert!(matches!(
            client.write("sim/time/paused", VarValue::Bool(true)).await,
            Err(BackendError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_simulator_probe_uses_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = WebApiClient::new(WebApiConfig {
            port,
            ..Default::default()
        })
        .unwrap();
        assert!(client.simulator_running().await);

        drop(listener);
        assert!(!client.simulator_running().await);
    }

    #[test]
    fn test_capabilities_shape() {
        let caps: Capabilities = serde_json::from_str(
            r#"{"api":{"versions":["v1","v2"]},"x-plane":{"version":"12.1.4"}}"#,
        )
        .unwrap();
        assert!(caps.api.versions.contains(&"v2".to_string()));

        let list: DatarefList =
            serde_json::from_str(r#"{"data":[{"id":1234,"name":"sim/time/paused","value_type":"int"}]}"#)
                .unwrap();
        assert_eq!(list.data[0].id, 1234);
    }
}
