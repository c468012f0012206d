use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use super::traits::{RequestParams, UpstreamTransport};

/// Path prefix under which the proxy forwards to the aggregation API.
const PROXY_PREFIX: &str = "api/proxy";

/// HTTP transport that reaches the aggregation API through the proxy.
///
/// - **Auth**: none here. The proxy injects the bearer credential server-side,
///   so this client never sees or sends it.
/// - **URL**: `{base_url}/api/proxy/{endpoint}?{params}`
/// - **Timeout**: one uniform per-request timeout for every call.
pub struct ProxyTransport {
    client: Client,
    base_url: String,
}

impl ProxyTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use a preconfigured `reqwest::Client` (shared connection pool, custom TLS...).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Full URL (without query string) for an endpoint.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{PROXY_PREFIX}/{}",
            self.base_url,
            endpoint.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl UpstreamTransport for ProxyTransport {
    fn name(&self) -> &str {
        "Portfolio API proxy"
    }

    async fn get(&self, endpoint: &str, params: &RequestParams) -> Result<Value, CoreError> {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint, "GET via proxy");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Http {
                status: status.as_u16(),
            });
        }

        resp.json::<Value>().await.map_err(|e| {
            CoreError::Deserialization(format!("Invalid JSON from {endpoint}: {e}"))
        })
    }
}
