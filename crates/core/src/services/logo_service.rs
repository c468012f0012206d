use chrono::TimeDelta;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::errors::CoreError;
use crate::models::cache::{CacheEntry, CacheStats};
use crate::models::chain::coingecko_platform;
use crate::models::settings::Settings;
use crate::providers::traits::LogoProvider;
use crate::storage::logo_store::{LogoEntries, LogoStore};

pub const DEFAULT_LOGO_TTL: TimeDelta = TimeDelta::hours(24);
pub const DEFAULT_PRELOAD_BATCH_SIZE: usize = 5;
pub const DEFAULT_PRELOAD_DELAY: Duration = Duration::from_millis(200);

const PLACEHOLDER_BASE: &str = "https://via.placeholder.com/32x32/6366f1/ffffff?text=";

/// A token whose logo should be resolved ahead of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoRequest {
    pub address: String,
    pub chain_id: u64,
    pub symbol: String,
}

impl LogoRequest {
    pub fn new(address: impl Into<String>, chain_id: u64, symbol: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            chain_id,
            symbol: symbol.into(),
        }
    }
}

/// Entry counts of both logo cache tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoCacheStats {
    pub runtime: CacheStats,
    pub durable: CacheStats,
}

/// Cache key of a contract logo: `token_logo:{chain_id}:{address lowercased}`.
pub fn logo_key(chain_id: u64, address: &str) -> String {
    format!("token_logo:{chain_id}:{}", address.to_lowercase())
}

/// Cache key of a symbol-search logo: `token_logo_search:{symbol lowercased}`.
pub fn search_key(symbol: &str) -> String {
    format!("token_logo_search:{}", symbol.to_lowercase())
}

/// Generated 32×32 image showing the symbol's first character.
pub fn placeholder_logo(symbol: &str) -> String {
    let initial = symbol
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string());
    format!("{PLACEHOLDER_BASE}{initial}")
}

/// Resets the preload flag when the preload finishes, however it finishes.
struct PreloadGuard<'a>(&'a AtomicBool);

impl Drop for PreloadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Resolves token icons through two cache tiers.
///
/// - **Durable tier**: loaded from the [`LogoStore`] at construction (stale
///   entries dropped), filled by [`preload_tokens`](Self::preload_tokens),
///   written back once per preload.
/// - **Runtime tier**: in-memory, filled by on-demand lookups.
///
/// Lookups never fail: contract lookup, then symbol search, then a placeholder.
pub struct LogoService {
    provider: Arc<dyn LogoProvider>,
    store: Arc<dyn LogoStore>,
    durable: Mutex<LogoEntries>,
    runtime: Mutex<HashMap<String, CacheEntry<String>>>,
    ttl: TimeDelta,
    batch_size: usize,
    batch_delay: Duration,
    preloading: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl LogoService {
    pub fn new(provider: Arc<dyn LogoProvider>, store: Arc<dyn LogoStore>) -> Self {
        Self::with_options(
            provider,
            store,
            Arc::new(SystemClock),
            DEFAULT_LOGO_TTL,
            DEFAULT_PRELOAD_BATCH_SIZE,
            DEFAULT_PRELOAD_DELAY,
        )
    }

    pub fn from_settings(
        settings: &Settings,
        provider: Arc<dyn LogoProvider>,
        store: Arc<dyn LogoStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_options(
            provider,
            store,
            clock,
            settings.logo_cache_ttl(),
            settings.logo_preload_batch_size,
            settings.logo_preload_delay(),
        )
    }

    pub fn with_options(
        provider: Arc<dyn LogoProvider>,
        store: Arc<dyn LogoStore>,
        clock: Arc<dyn Clock>,
        ttl: TimeDelta,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        let now = clock.now();
        let durable: LogoEntries = match store.load() {
            Ok(entries) => entries
                .into_iter()
                .filter(|(_, entry)| entry.is_fresh(now, ttl))
                .collect(),
            Err(e) => {
                warn!(error = %e, "failed to load durable logo cache, starting empty");
                LogoEntries::new()
            }
        };
        debug!(entries = durable.len(), "loaded durable logo cache");

        Self {
            provider,
            store,
            durable: Mutex::new(durable),
            runtime: Mutex::new(HashMap::new()),
            ttl,
            batch_size: batch_size.max(1),
            batch_delay,
            preloading: AtomicBool::new(false),
            clock,
        }
    }

    /// Logo URL for a token; always returns something displayable.
    ///
    /// Tokens without a contract address skip the contract tiers and resolve
    /// by symbol only.
    pub async fn get_token_logo(&self, address: &str, chain_id: u64, symbol: &str) -> String {
        if address.is_empty() {
            return self.fallback_logo(symbol).await;
        }
        let key = logo_key(chain_id, address);
        if let Some(url) = self.fresh_durable(&key).or_else(|| self.fresh_runtime(&key)) {
            return url;
        }

        match self.fetch_token_logo(address, chain_id, symbol).await {
            Ok(url) => {
                self.remember(key, url.clone());
                url
            }
            Err(e) => {
                warn!(address, chain_id, error = %e, "logo lookup failed, using fallback");
                self.fallback_logo(symbol).await
            }
        }
    }

    /// Contract lookup with search fallback.
    ///
    /// Only transport failures surface as `Err`; "not found" answers fall
    /// through to the symbol search.
    async fn fetch_token_logo(
        &self,
        address: &str,
        chain_id: u64,
        symbol: &str,
    ) -> Result<String, CoreError> {
        let Some(platform) = coingecko_platform(chain_id) else {
            debug!(chain_id, "no logo platform for chain");
            return Ok(self.fallback_logo(symbol).await);
        };
        if address.is_empty() {
            return Ok(self.fallback_logo(symbol).await);
        }

        match self.provider.logo_by_contract(platform, address).await {
            Ok(Some(url)) => Ok(url),
            Ok(None) | Err(CoreError::Http { .. }) => Ok(self.fallback_logo(symbol).await),
            Err(e) => Err(e),
        }
    }

    /// Symbol search, memoised under its own key; placeholder when nothing matches.
    async fn fallback_logo(&self, symbol: &str) -> String {
        let key = search_key(symbol);
        if let Some(url) = self.fresh_runtime(&key) {
            return url;
        }

        if !symbol.is_empty() {
            match self.provider.search_logo(symbol).await {
                Ok(Some(url)) => {
                    self.remember(key, url.clone());
                    return url;
                }
                Ok(None) => debug!(symbol, "no search match for logo"),
                Err(e) => warn!(symbol, error = %e, "logo search failed"),
            }
        }

        placeholder_logo(symbol)
    }

    /// Resolve logos for `tokens` ahead of time into the durable tier.
    ///
    /// Runs in batches with a pause in between, skips tokens already cached in
    /// either tier, and persists once at the end. A preload started while
    /// another is running returns immediately. Returns how many logos were
    /// newly resolved.
    pub async fn preload_tokens(&self, tokens: &[LogoRequest]) -> usize {
        if self.preloading.swap(true, Ordering::SeqCst) {
            debug!("logo preload already running");
            return 0;
        }
        let _guard = PreloadGuard(&self.preloading);
        info!(tokens = tokens.len(), "preloading token logos");

        let mut resolved = 0;
        let batches: Vec<&[LogoRequest]> = tokens.chunks(self.batch_size).collect();
        for (i, batch) in batches.iter().enumerate() {
            let results = join_all(batch.iter().map(|token| self.preload_one(token))).await;
            resolved += results.into_iter().filter(|done| *done).count();

            if i + 1 < batches.len() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let snapshot = self.durable.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Err(e) = self.store.save(&snapshot) {
            warn!(error = %e, "failed to persist logo cache");
        }
        info!(resolved, total = snapshot.len(), "logo preload finished");
        resolved
    }

    async fn preload_one(&self, token: &LogoRequest) -> bool {
        let key = logo_key(token.chain_id, &token.address);
        if token.address.is_empty() || self.is_cached(&key) {
            return false;
        }

        match self
            .fetch_token_logo(&token.address, token.chain_id, &token.symbol)
            .await
        {
            Ok(url) => {
                let entry = CacheEntry::new(url, self.clock.now());
                self.durable
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(key, entry);
                true
            }
            Err(e) => {
                warn!(symbol = %token.symbol, error = %e, "failed to preload logo");
                false
            }
        }
    }

    /// Empty both tiers and the durable store.
    pub fn clear_cache(&self) {
        self.runtime.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.durable.lock().unwrap_or_else(|e| e.into_inner()).clear();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear durable logo cache");
        }
        info!("logo cache cleared");
    }

    pub fn cache_stats(&self) -> LogoCacheStats {
        let now = self.clock.now();
        let runtime = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
        let durable = self.durable.lock().unwrap_or_else(|e| e.into_inner());
        LogoCacheStats {
            runtime: CacheStats::from_entries(runtime.values(), now, self.ttl),
            durable: CacheStats::from_entries(durable.values(), now, self.ttl),
        }
    }

    pub fn is_preloading(&self) -> bool {
        self.preloading.load(Ordering::SeqCst)
    }

    // ── Cache tiers ─────────────────────────────────────────────────

    fn fresh_durable(&self, key: &str) -> Option<String> {
        let durable = self.durable.lock().unwrap_or_else(|e| e.into_inner());
        durable
            .get(key)
            .filter(|entry| entry.is_fresh(self.clock.now(), self.ttl))
            .map(|entry| entry.payload.clone())
    }

    fn fresh_runtime(&self, key: &str) -> Option<String> {
        let runtime = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
        runtime
            .get(key)
            .filter(|entry| entry.is_fresh(self.clock.now(), self.ttl))
            .map(|entry| entry.payload.clone())
    }

    /// Present in either tier, fresh or not.
    fn is_cached(&self, key: &str) -> bool {
        self.runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
            || self
                .durable
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains_key(key)
    }

    fn remember(&self, key: String, url: String) {
        let entry = CacheEntry::new(url, self.clock.now());
        self.runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }
}
