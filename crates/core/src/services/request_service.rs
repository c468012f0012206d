use chrono::TimeDelta;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::errors::CoreError;
use crate::models::cache::{CacheEntry, CacheStats};
use crate::providers::traits::{RequestParams, UpstreamTransport};

/// Response TTL when neither the caller nor the settings override it.
pub const DEFAULT_CACHE_TTL: TimeDelta = TimeDelta::minutes(5);

/// Per-call cache controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the service's default TTL for the read check.
    pub cache_ttl: Option<TimeDelta>,

    /// Bypass the cache entirely: no read, no write.
    pub skip_cache: bool,
}

impl RequestOptions {
    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            cache_ttl: Some(ttl),
            skip_cache: false,
        }
    }

    pub fn uncached() -> Self {
        Self {
            cache_ttl: None,
            skip_cache: true,
        }
    }
}

/// Single entry point for every call to the aggregation API.
///
/// Responses are memoised by `(endpoint, params)` for a TTL (5 minutes by
/// default). Expired entries stay in the map until overwritten or cleared;
/// they are only ignored on read. Failed calls are never cached.
pub struct RequestService {
    transport: Arc<dyn UpstreamTransport>,
    cache: Mutex<HashMap<String, CacheEntry<Value>>>,
    default_ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl RequestService {
    pub fn new(transport: Arc<dyn UpstreamTransport>) -> Self {
        Self::with_clock(transport, DEFAULT_CACHE_TTL, Arc::new(SystemClock))
    }

    pub fn with_clock(
        transport: Arc<dyn UpstreamTransport>,
        default_ttl: TimeDelta,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            cache: Mutex::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> TimeDelta {
        self.default_ttl
    }

    /// `"{endpoint}:{params as JSON}"`. Params are key-ordered, so equal
    /// parameter sets always produce the same key.
    pub fn cache_key(endpoint: &str, params: &RequestParams) -> String {
        let rendered = serde_json::to_string(params).unwrap_or_else(|_| "{}".to_string());
        format!("{endpoint}:{rendered}")
    }

    /// GET `endpoint` through the transport, serving from cache when fresh.
    ///
    /// 1. Unless `skip_cache`: return the cached payload if `now - stored < ttl`.
    /// 2. Otherwise call the transport (non-2xx surfaces as `CoreError::Http`).
    /// 3. On success store the payload, again unless `skip_cache`.
    pub async fn make_request(
        &self,
        endpoint: &str,
        params: &RequestParams,
        options: RequestOptions,
    ) -> Result<Value, CoreError> {
        let ttl = options.cache_ttl.unwrap_or(self.default_ttl);
        let key = Self::cache_key(endpoint, params);

        if !options.skip_cache {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = cache.get(&key) {
                if entry.is_fresh(self.clock.now(), ttl) {
                    debug!(endpoint, "request cache hit");
                    return Ok(entry.payload.clone());
                }
            }
        }

        debug!(endpoint, transport = self.transport.name(), "request cache miss");
        let payload = self.transport.get(endpoint, params).await?;

        if !options.skip_cache {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.insert(key, CacheEntry::new(payload.clone(), self.clock.now()));
        }

        Ok(payload)
    }

    /// Standard query for the portfolio endpoints.
    ///
    /// `addresses`, `chain_id`, `timerange`, `closed=true`, `closed_threshold=1`,
    /// `use_cache=true`; entries in `extra` override any of these.
    pub fn portfolio_params(
        wallet_address: &str,
        chain_id: u64,
        timerange: &str,
        extra: &RequestParams,
    ) -> RequestParams {
        let mut params = RequestParams::new();
        params.insert("addresses".into(), wallet_address.to_string());
        params.insert("chain_id".into(), chain_id.to_string());
        params.insert("timerange".into(), timerange.to_string());
        params.insert("closed".into(), "true".into());
        params.insert("closed_threshold".into(), "1".into());
        params.insert("use_cache".into(), "true".into());
        for (key, value) in extra {
            params.insert(key.clone(), value.clone());
        }
        params
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        debug!("request cache cleared");
    }

    /// Entry counts, with validity judged against the default TTL.
    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        CacheStats::from_entries(cache.values(), self.clock.now(), self.default_ttl)
    }
}
