use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use super::traits::LogoProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Per-request timeout when none is configured; matches the settings default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// CoinGecko provider for token logos.
///
/// - **Free**: works without a key; a demo key raises the rate limit.
/// - **Endpoints**: `/coins/{platform}/contract/{address}`, `/search?query={symbol}`
/// - **Images**: both lookups prefer `small`, then `thumb`, then `large`.
pub struct CoinGeckoLogoProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoLogoProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Point at a different API root (a paid tier, or a mock server in tests).
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, base_url, api_key)
    }

    /// Same as [`with_base_url`](Self::with_base_url) with an explicit
    /// per-request timeout, as configured for the proxy transport.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, CoreError> {
        let resp = self
            .authorized(self.client.get(url).query(query))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Http {
                status: status.as_u16(),
            });
        }

        resp.json().await.map_err(|e| CoreError::Api {
            provider: "CoinGecko".into(),
            message: format!("Failed to parse {what}: {e}"),
        })
    }
}

impl Default for CoinGeckoLogoProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

// ── CoinGecko API response types ────────────────────────────────────

#[derive(Deserialize)]
struct ContractResponse {
    #[serde(default)]
    image: Option<ImageSet>,
}

#[derive(Deserialize)]
struct ImageSet {
    #[serde(default)]
    thumb: Option<String>,
    #[serde(default)]
    small: Option<String>,
    #[serde(default)]
    large: Option<String>,
}

impl ImageSet {
    fn preferred(self) -> Option<String> {
        [self.small, self.thumb, self.large]
            .into_iter()
            .flatten()
            .find(|url| !url.is_empty())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Deserialize)]
struct SearchCoin {
    symbol: String,
    #[serde(default)]
    thumb: Option<String>,
    #[serde(default)]
    small: Option<String>,
    #[serde(default)]
    large: Option<String>,
}

#[async_trait]
impl LogoProvider for CoinGeckoLogoProvider {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn logo_by_contract(
        &self,
        platform: &str,
        address: &str,
    ) -> Result<Option<String>, CoreError> {
        let url = format!(
            "{}/coins/{platform}/contract/{}",
            self.base_url,
            address.to_lowercase()
        );
        let resp: ContractResponse = self.get_json(&url, &[], "contract lookup").await?;
        Ok(resp.image.and_then(ImageSet::preferred))
    }

    async fn search_logo(&self, symbol: &str) -> Result<Option<String>, CoreError> {
        let url = format!("{}/search", self.base_url);
        let resp: SearchResponse = self
            .get_json(&url, &[("query", symbol)], "search results")
            .await?;

        let wanted = symbol.to_lowercase();
        Ok(resp
            .coins
            .into_iter()
            .find(|c| c.symbol.to_lowercase() == wanted)
            .and_then(|c| {
                ImageSet {
                    thumb: c.thumb,
                    small: c.small,
                    large: c.large,
                }
                .preferred()
            }))
    }
}
