use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CoreError;
use super::rebalancing::Allocations;

/// Runtime configuration for the portfolio core.
///
/// Everything has a working default except `proxy_base_url`: without it the
/// tracker can still be built, but every fetch reports a configuration error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Origin of the proxy that injects the API credential (e.g., "http://localhost:3000").
    /// Requests go to `{proxy_base_url}/api/proxy/{endpoint}`.
    pub proxy_base_url: Option<String>,

    /// Timeout applied to every outgoing HTTP request.
    pub request_timeout_secs: u64,

    /// TTL of cached API responses.
    pub cache_ttl_secs: u64,

    /// TTL of resolved token logos (both cache tiers).
    pub logo_cache_ttl_secs: u64,

    /// `timerange` query parameter sent to the holdings endpoint.
    pub timerange: String,

    /// CoinGecko API base URL.
    pub coingecko_base_url: String,

    /// Optional CoinGecko demo API key (sent as `x-cg-demo-api-key`).
    pub coingecko_api_key: Option<String>,

    /// Where the durable logo cache lives. `None` keeps it in memory only.
    pub logo_cache_path: Option<PathBuf>,

    /// Tokens per logo preload batch.
    pub logo_preload_batch_size: usize,

    /// Pause between logo preload batches.
    pub logo_preload_delay_ms: u64,

    /// Interval of the background portfolio refresh.
    pub refresh_interval_secs: u64,

    /// Drift (percentage points) at which rebalancing is suggested.
    pub drift_threshold: f64,

    /// Target allocation in percent per symbol.
    pub target_allocations: Allocations,
}

impl Default for Settings {
    fn default() -> Self {
        let mut target_allocations = Allocations::new();
        target_allocations.insert("ETH".to_string(), 50.0);
        target_allocations.insert("WBTC".to_string(), 30.0);
        target_allocations.insert("USDC".to_string(), 20.0);

        Self {
            proxy_base_url: None,
            request_timeout_secs: 30,
            cache_ttl_secs: 5 * 60,
            logo_cache_ttl_secs: 24 * 60 * 60,
            timerange: "1week".to_string(),
            coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_api_key: None,
            logo_cache_path: None,
            logo_preload_batch_size: 5,
            logo_preload_delay_ms: 200,
            refresh_interval_secs: 30,
            drift_threshold: 5.0,
            target_allocations,
        }
    }
}

impl Settings {
    /// Build settings from the environment (after loading `.env`, if present).
    ///
    /// Recognised variables: `PORTFOLIO_PROXY_URL`, `PORTFOLIO_REQUEST_TIMEOUT_SECS`,
    /// `PORTFOLIO_CACHE_TTL_SECS`, `PORTFOLIO_LOGO_CACHE_TTL_SECS`, `PORTFOLIO_LOGO_CACHE_PATH`,
    /// `PORTFOLIO_REFRESH_INTERVAL_SECS`, `COINGECKO_BASE_URL`, `COINGECKO_API_KEY`.
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        let mut settings = Self::default();

        if let Some(url) = env_string("PORTFOLIO_PROXY_URL") {
            settings.proxy_base_url = Some(url);
        }
        if let Some(secs) = env_u64("PORTFOLIO_REQUEST_TIMEOUT_SECS")? {
            settings.request_timeout_secs = secs;
        }
        if let Some(secs) = env_u64("PORTFOLIO_CACHE_TTL_SECS")? {
            settings.cache_ttl_secs = secs;
        }
        if let Some(secs) = env_u64("PORTFOLIO_LOGO_CACHE_TTL_SECS")? {
            settings.logo_cache_ttl_secs = secs;
        }
        if let Some(secs) = env_u64("PORTFOLIO_REFRESH_INTERVAL_SECS")? {
            settings.refresh_interval_secs = secs;
        }
        if let Some(path) = env_string("PORTFOLIO_LOGO_CACHE_PATH") {
            settings.logo_cache_path = Some(PathBuf::from(path));
        }
        if let Some(url) = env_string("COINGECKO_BASE_URL") {
            settings.coingecko_base_url = url;
        }
        settings.coingecko_api_key = env_string("COINGECKO_API_KEY");

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> TimeDelta {
        ttl_from_secs(self.cache_ttl_secs)
    }

    pub fn logo_cache_ttl(&self) -> TimeDelta {
        ttl_from_secs(self.logo_cache_ttl_secs)
    }

    pub fn logo_preload_delay(&self) -> Duration {
        Duration::from_millis(self.logo_preload_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Out-of-range values saturate to `TimeDelta::MAX`.
fn ttl_from_secs(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>, CoreError> {
    match env_string(key) {
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            CoreError::Configuration(format!("{key} must be a whole number of seconds, got '{raw}'"))
        }),
        None => Ok(None),
    }
}
