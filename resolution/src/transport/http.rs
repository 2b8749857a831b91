//! JSON-RPC over HTTP.
//!
//! Failures are split the way callers need them:
//!
//! - connection failures, timeouts and 5xx → `NamingServiceDown`
//! - HTTP 429 and other 4xx, JSON-RPC error objects, undecodable bodies →
//!   `ServiceProviderError`

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, trace};

use super::rpc::{RpcRequest, RpcResponse};
use super::Provider;
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::error::{ConfigurationError, ResolutionError, Result};

/// A [`Provider`] that POSTs JSON-RPC envelopes to a fixed URL.
#[derive(Debug)]
pub struct HttpProvider {
    client: Client,
    url: Url,
    label: String,
    next_id: AtomicU64,
}

impl HttpProvider {
    /// `label` names the provider in errors, e.g. `"UNS L2 (polygon-mainnet)"`.
    pub fn new(url: &str, label: impl Into<String>) -> std::result::Result<Self, ConfigurationError> {
        Self::with_timeout(url, label, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        url: &str,
        label: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, ConfigurationError> {
        let url = Url::parse(url).map_err(|_| ConfigurationError::InvalidUrl(url.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidUrl(url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url,
            label: label.into(),
            next_id: AtomicU64::new(1),
        })
    }

    fn down(&self, reason: impl Into<String>) -> ResolutionError {
        ResolutionError::NamingServiceDown {
            service: self.label.clone(),
            reason: reason.into(),
        }
    }

    fn provider_error(&self, code: Option<i64>, message: impl Into<String>) -> ResolutionError {
        ResolutionError::ServiceProviderError {
            provider: self.label.clone(),
            code,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest::new(serde_json::json!(id), method, params);
        debug!(provider = %self.label, method, id, "json-rpc request");
        trace!(params = %body.params, "json-rpc params");

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.down(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(self.provider_error(Some(429), "rate limited"));
        }
        if status.is_server_error() {
            return Err(self.down(format!("http status {}", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.provider_error(
                Some(i64::from(status.as_u16())),
                format!("http status {}: {}", status, text),
            ));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| self.provider_error(None, format!("malformed json-rpc reply: {}", e)))?;
        envelope.into_result(&self.label)
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn url(&self) -> Option<&str> {
        Some(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unparseable_urls() {
        assert!(matches!(
            HttpProvider::new("not a url", "test"),
            Err(ConfigurationError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpProvider::new("ftp://example.com", "test"),
            Err(ConfigurationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_keeps_label_and_url() {
        let provider = HttpProvider::new("https://mainnet.example.org/rpc", "UNS L1").unwrap();
        assert_eq!(provider.name(), "UNS L1");
        assert_eq!(provider.url(), Some("https://mainnet.example.org/rpc"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_service_down() {
        // Port 9 (discard) on localhost is closed in any sane test environment.
        let provider = HttpProvider::with_timeout(
            "http://127.0.0.1:9/",
            "local",
            Duration::from_millis(500),
        )
        .unwrap();
        let err = provider
            .request("net_version", serde_json::json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NamingServiceDown { .. }));
    }
}
