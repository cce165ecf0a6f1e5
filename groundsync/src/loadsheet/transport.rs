//! HTTP transport for loadsheet requests.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

use super::LoadsheetKind;

/// Default base URL of the aircraft backend's local server.
pub const DEFAULT_LOADSHEET_URL: &str = "http://127.0.0.1:8380";

/// Upper bound for any request timeout.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Health check returned status {0}")]
    Unhealthy(u16),

    #[error("Request failed: {0}")]
    Other(String),
}

/// Raw HTTP answer; non-2xx statuses are returned, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Loadsheet endpoints of the aircraft backend.
pub trait LoadsheetTransport: Send + Sync {
    /// `POST {base}/loadsheet/generate?type={kind}` with body `{}`.
    fn generate(
        &self,
        kind: LoadsheetKind,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;

    /// `GET {base}/health`; any 2xx is healthy.
    fn health(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// `POST {base}/loadsheet/resend`.
    fn resend(&self) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;

    /// `DELETE {base}/loadsheet`.
    fn clear(&self) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// reqwest implementation of [`LoadsheetTransport`].
#[derive(Clone)]
pub struct HttpLoadsheetClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLoadsheetClient {
    /// Create a client. The timeout is capped at [`MAX_REQUEST_TIMEOUT`].
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout.min(MAX_REQUEST_TIMEOUT))
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn into_response(
        result: Result<reqwest::Response, reqwest::Error>,
        url: &str,
    ) -> Result<TransportResponse, TransportError> {
        let response = result.map_err(|e| {
            warn!(
                url,
                error = %e,
                is_connect = e.is_connect(),
                is_timeout = e.is_timeout(),
                "Loadsheet request failed"
            );
            map_reqwest_error(e)
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;
        debug!(url, status, "Loadsheet server answered");
        Ok(TransportResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

impl LoadsheetTransport for HttpLoadsheetClient {
    async fn generate(&self, kind: LoadsheetKind) -> Result<TransportResponse, TransportError> {
        let url = format!("{}/loadsheet/generate", self.base_url);
        trace!(url = %url, kind = %kind, "POST loadsheet generate");
        let result = self
            .client
            .post(&url)
            .query(&[("type", kind.to_string())])
            .json(&serde_json::json!({}))
            .send()
            .await;
        Self::into_response(result, &url).await
    }

    async fn health(&self) -> Result<(), TransportError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Unhealthy(status.as_u16()))
        }
    }

    async fn resend(&self) -> Result<TransportResponse, TransportError> {
        let url = format!("{}/loadsheet/resend", self.base_url);
        let result = self.client.post(&url).send().await;
        Self::into_response(result, &url).await
    }

    async fn clear(&self) -> Result<TransportResponse, TransportError> {
        let url = format!("{}/loadsheet", self.base_url);
        let result = self.client.delete(&url).send().await;
        Self::into_response(result, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            HttpLoadsheetClient::new("http://localhost:8380/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8380");
    }

    #[test]
    fn test_success_range() {
        let ok = TransportResponse {
            status: 204,
            body: String::new(),
        };
        let bad = TransportResponse {
            status: 503,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connect_or_timeout() {
        // port 9 (discard) is closed on any sane test host
        let client =
            HttpLoadsheetClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = client.health().await;
        assert!(matches!(
            result,
            Err(TransportError::Connect(_)) | Err(TransportError::Timeout) | Err(TransportError::Other(_))
        ));
    }
}
