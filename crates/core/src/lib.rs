pub mod clock;
pub mod errors;
pub mod format;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use clock::{Clock, SystemClock};
use errors::CoreError;
use models::{
    cache::CacheStats,
    portfolio::PortfolioSummary,
    rebalancing::{AllocationValidation, Allocations},
    settings::Settings,
    state::PortfolioState,
    token::TokenMetrics,
    transaction::{TransactionAnalytics, TransactionQuery},
};
use providers::{
    coingecko::CoinGeckoLogoProvider,
    proxy::ProxyTransport,
    traits::{LogoProvider, UpstreamTransport},
};
use services::{
    logo_service::{LogoCacheStats, LogoRequest, LogoService},
    portfolio_service::PortfolioService,
    price_service::PriceService,
    rebalancing_service::RebalancingService,
    request_service::RequestService,
    transaction_service::TransactionAnalyticsService,
};
use storage::logo_store::{JsonFileLogoStore, LogoStore, MemoryLogoStore};

/// Store error when no upstream transport is configured.
pub const PROXY_NOT_CONFIGURED: &str = "Portfolio API proxy not configured";

/// Store error when rebalancing is requested without a wallet or transport.
pub const REBALANCE_UNAVAILABLE: &str = "Wallet address or API service not available";

/// Shortest auto-refresh period accepted by [`PortfolioTracker::spawn_auto_refresh`].
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Services that need the upstream API; absent when no proxy is configured.
struct Upstream {
    requests: Arc<RequestService>,
    portfolio: PortfolioService,
    prices: PriceService,
}

/// Clears the refresh in-flight flag when the refresh ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Main entry point for the portfolio core library.
///
/// Owns the services and the published [`PortfolioState`]. Every change
/// builds a new state and swaps it in whole; observers get it through
/// [`subscribe`](Self::subscribe). Shared across tasks as `Arc<PortfolioTracker>`.
#[must_use]
pub struct PortfolioTracker {
    settings: Settings,
    upstream: Option<Upstream>,
    logo_service: Arc<LogoService>,
    rebalancing_service: RebalancingService,
    transaction_service: TransactionAnalyticsService,
    clock: Arc<dyn Clock>,
    state: watch::Sender<Arc<PortfolioState>>,
    /// Bumped by every fetch and wallet change; results from older generations are dropped.
    generation: AtomicU64,
    /// Bumped only by wallet changes.
    wallet_generation: AtomicU64,
    refresh_in_flight: AtomicBool,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("PortfolioTracker")
            .field("wallet_address", &state.wallet_address)
            .field("chains", &state.chains.len())
            .field("total_value", &state.total_value)
            .field("configured", &self.upstream.is_some())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl PortfolioTracker {
    /// Wire the tracker from explicit parts.
    ///
    /// `transport = None` builds a tracker whose fetches report
    /// [`PROXY_NOT_CONFIGURED`] instead of touching the network.
    pub fn new(
        settings: Settings,
        transport: Option<Arc<dyn UpstreamTransport>>,
        logo_provider: Arc<dyn LogoProvider>,
        logo_store: Arc<dyn LogoStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let logo_service = Arc::new(LogoService::from_settings(
            &settings,
            logo_provider,
            logo_store,
            clock.clone(),
        ));

        let upstream = transport.map(|transport| {
            let requests = Arc::new(RequestService::with_clock(
                transport,
                settings.cache_ttl(),
                clock.clone(),
            ));
            let portfolio = PortfolioService::with_clock(
                requests.clone(),
                logo_service.clone(),
                clock.clone(),
                settings.timerange.clone(),
            );
            Upstream {
                prices: PriceService::new(requests.clone()),
                requests,
                portfolio,
            }
        });

        let initial = PortfolioState::new(settings.target_allocations.clone(), settings.drift_threshold);
        let (state, _) = watch::channel(Arc::new(initial));

        Self {
            settings,
            upstream,
            logo_service,
            rebalancing_service: RebalancingService::new(),
            transaction_service: TransactionAnalyticsService::with_clock(clock.clone()),
            clock,
            state,
            generation: AtomicU64::new(0),
            wallet_generation: AtomicU64::new(0),
            refresh_in_flight: AtomicBool::new(false),
        }
    }

    /// Production wiring: proxy transport, CoinGecko logos, and a JSON logo
    /// cache file when `logo_cache_path` is set (in-memory otherwise).
    pub fn from_settings(settings: Settings) -> Result<Self, CoreError> {
        let transport: Option<Arc<dyn UpstreamTransport>> = match &settings.proxy_base_url {
            Some(url) => Some(Arc::new(ProxyTransport::new(
                url.clone(),
                settings.request_timeout(),
            )?)),
            None => None,
        };
        let logo_provider = Arc::new(CoinGeckoLogoProvider::with_timeout(
            settings.coingecko_base_url.clone(),
            settings.coingecko_api_key.clone(),
            settings.request_timeout(),
        )?);
        let logo_store: Arc<dyn LogoStore> = match &settings.logo_cache_path {
            Some(path) => Arc::new(JsonFileLogoStore::new(path.clone())),
            None => Arc::new(MemoryLogoStore::new()),
        };

        Ok(Self::new(
            settings,
            transport,
            logo_provider,
            logo_store,
            Arc::new(SystemClock),
        ))
    }

    /// [`from_settings`](Self::from_settings) with [`Settings::from_env`].
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_settings(Settings::from_env()?)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── State ───────────────────────────────────────────────────────

    /// The current published state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PortfolioState> {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PortfolioState>> {
        self.state.subscribe()
    }

    /// True when no fetch has succeeded yet or the last one is older than
    /// the refresh interval.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        match self.snapshot().last_updated {
            Some(at) => (self.clock.now() - at)
                .to_std()
                .is_ok_and(|age| age >= self.settings.refresh_interval()),
            None => true,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut PortfolioState)) {
        self.state.send_modify(|current| {
            let mut next = PortfolioState::clone(current);
            apply(&mut next);
            *current = Arc::new(next);
        });
    }

    /// Apply `apply` only if `counter` still reads `expected`; checked under
    /// the state lock so an outdated result can never overwrite a newer one.
    fn update_if_current(
        &self,
        counter: &AtomicU64,
        expected: u64,
        apply: impl FnOnce(&mut PortfolioState),
    ) -> bool {
        self.state.send_if_modified(|current| {
            if counter.load(Ordering::SeqCst) != expected {
                return false;
            }
            let mut next = PortfolioState::clone(current);
            apply(&mut next);
            *current = Arc::new(next);
            true
        })
    }

    // ── Store actions ───────────────────────────────────────────────

    /// Select the wallet to track. An empty address clears the selection.
    ///
    /// Any fetch still running for the previous wallet is discarded. Holdings
    /// are kept when the same wallet is set again and cleared otherwise.
    pub fn set_wallet_address(&self, address: impl Into<String>) {
        let address = address.into().trim().to_string();
        let address = (!address.is_empty()).then_some(address);

        self.state.send_modify(|current| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.wallet_generation.fetch_add(1, Ordering::SeqCst);
            let mut next = PortfolioState::clone(current);
            let same_wallet = match (&next.wallet_address, &address) {
                (Some(old), Some(new)) => old.eq_ignore_ascii_case(new),
                _ => false,
            };
            if !same_wallet {
                next.total_value = 0.0;
                next.chains.clear();
                next.degraded_chains.clear();
                next.last_updated = None;
                next.rebalancing_suggestions.clear();
                next.needs_rebalancing = false;
                next.max_drift = 0.0;
            }
            next.wallet_address = address;
            next.is_loading = false;
            *current = Arc::new(next);
        });
    }

    /// Fetch every supported chain for the current wallet and publish the result.
    ///
    /// Failures never propagate: a missing wallet or transport lands in
    /// `state.error`, failing chains are zeroed and listed in `degraded_chains`.
    /// If a newer fetch or wallet change happens meanwhile, this result is dropped.
    pub async fn fetch_portfolio(&self) -> Arc<PortfolioState> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(wallet) = self.snapshot().wallet_address.clone() else {
            self.update(|s| s.error = Some(CoreError::MissingWalletAddress.to_string()));
            return self.snapshot();
        };
        let Some(upstream) = &self.upstream else {
            self.update(|s| s.error = Some(PROXY_NOT_CONFIGURED.to_string()));
            return self.snapshot();
        };

        self.update_if_current(&self.generation, generation, |s| {
            s.is_loading = true;
            s.error = None;
        });

        let portfolio = upstream.portfolio.get_multi_chain_portfolio(&wallet).await;

        let applied = self.update_if_current(&self.generation, generation, |s| {
            s.total_value = portfolio.total_value;
            s.chains = portfolio.chains;
            s.degraded_chains = portfolio.degraded_chains;
            s.last_updated = Some(portfolio.fetched_at);
            s.is_loading = false;
        });
        if !applied {
            debug!(generation, "discarding outdated portfolio result");
        }

        self.snapshot()
    }

    /// Timer-driven refresh: skipped when no wallet is set or a refresh is
    /// already running. Returns `None` when skipped.
    pub async fn refresh(&self) -> Option<Arc<PortfolioState>> {
        if self.snapshot().wallet_address.is_none() {
            return None;
        }
        if self.refresh_in_flight.swap(true, Ordering::SeqCst) {
            debug!("refresh already in flight, skipping");
            return None;
        }
        let _in_flight = InFlight(&self.refresh_in_flight);
        Some(self.fetch_portfolio().await)
    }

    /// User-initiated refresh: drop cached API responses, then fetch.
    pub async fn manual_refresh(&self) -> Arc<PortfolioState> {
        if let Some(upstream) = &self.upstream {
            upstream.requests.clear_cache();
        }
        self.fetch_portfolio().await
    }

    /// Compare current holdings with the target allocations and publish the
    /// suggested trades.
    pub async fn generate_rebalancing_suggestions(&self) -> Arc<PortfolioState> {
        let wallet = self.snapshot().wallet_address.clone();
        let (Some(wallet), Some(upstream)) = (wallet, &self.upstream) else {
            self.update(|s| s.error = Some(REBALANCE_UNAVAILABLE.to_string()));
            return self.snapshot();
        };

        // Concurrent fetches do not invalidate the result, only a wallet change does
        let wallet_generation = self.wallet_generation.load(Ordering::SeqCst);
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let portfolio = upstream.portfolio.get_multi_chain_portfolio(&wallet).await;

        let state = self.snapshot();
        let current = self
            .rebalancing_service
            .calculate_current_allocations(&portfolio.chains, portfolio.total_value);
        let result = self.rebalancing_service.generate_rebalancing_suggestions(
            &current,
            &state.target_allocations,
            portfolio.total_value,
            state.drift_threshold,
        );
        info!(
            needs_rebalancing = result.needs_rebalancing,
            suggestions = result.suggestions.len(),
            "rebalancing evaluated"
        );

        let applied = self.update_if_current(&self.wallet_generation, wallet_generation, |s| {
            s.rebalancing_suggestions = result.suggestions;
            s.needs_rebalancing = result.needs_rebalancing;
            s.max_drift = result.max_drift.unwrap_or(0.0);
            s.is_loading = false;
        });
        if !applied {
            debug!("wallet changed during rebalancing, result dropped");
        }

        self.snapshot()
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    /// Replace the target allocations. Not validated here; see
    /// [`validate_target_allocations`](Self::validate_target_allocations).
    pub fn set_target_allocations(&self, allocations: Allocations) {
        self.update(|s| s.target_allocations = allocations);
    }

    pub fn set_drift_threshold(&self, threshold: f64) {
        self.update(|s| s.drift_threshold = threshold);
    }

    /// Start refreshing every `refresh_interval_secs` in the background.
    ///
    /// The task holds a weak reference and stops once the tracker is dropped.
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::downgrade(self);
        let period = self.settings.refresh_interval().max(MIN_REFRESH_INTERVAL);
        info!(period_secs = period.as_secs(), "auto-refresh started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(tracker) = tracker.upgrade() else {
                    debug!("tracker dropped, auto-refresh stopped");
                    break;
                };
                tracker.refresh().await;
            }
        })
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Summarize the wallet's transaction history on one chain, optionally for one token.
    pub async fn fetch_transaction_analytics(
        &self,
        chain_id: u64,
        token_address: Option<&str>,
    ) -> Result<TransactionAnalytics, CoreError> {
        let wallet = self
            .snapshot()
            .wallet_address
            .clone()
            .ok_or(CoreError::MissingWalletAddress)?;
        let upstream = self
            .upstream
            .as_ref()
            .ok_or_else(|| CoreError::Configuration(PROXY_NOT_CONFIGURED.to_string()))?;

        let mut query = TransactionQuery::new(wallet, chain_id);
        if let Some(token) = token_address {
            query = query.with_token(token);
        }

        let transactions = self
            .transaction_service
            .fetch_transactions(&upstream.requests, &query)
            .await?;
        Ok(self.transaction_service.process_transaction_analytics(&transactions))
    }

    /// Spot USD price of one token. `Ok(None)` when upstream has no price for it.
    pub async fn fetch_token_price(
        &self,
        chain_id: u64,
        token_address: &str,
    ) -> Result<Option<f64>, CoreError> {
        let upstream = self
            .upstream
            .as_ref()
            .ok_or_else(|| CoreError::Configuration(PROXY_NOT_CONFIGURED.to_string()))?;
        upstream.prices.fetch_token_price(chain_id, token_address).await
    }

    /// Profit and ROI of a held token, looked up in the published portfolio.
    #[must_use]
    pub fn token_metrics(&self, chain_id: u64, address: &str) -> Option<TokenMetrics> {
        if address.is_empty() {
            return None;
        }
        let state = self.snapshot();
        PortfolioService::find_token(&state.chains, chain_id, address)
            .map(|token| TokenMetrics::from_holding(chain_id, token))
    }

    /// Headline numbers of the published portfolio.
    #[must_use]
    pub fn portfolio_summary(&self) -> PortfolioSummary {
        let state = self.snapshot();
        PortfolioService::summarize_chains(&state.chains, state.total_value)
    }

    /// Symbol → percent of portfolio value for the published holdings.
    #[must_use]
    pub fn current_allocations(&self) -> Allocations {
        let state = self.snapshot();
        self.rebalancing_service
            .calculate_current_allocations(&state.chains, state.total_value)
    }

    #[must_use]
    pub fn validate_target_allocations(&self) -> AllocationValidation {
        self.rebalancing_service
            .validate_target_allocations(&self.snapshot().target_allocations)
    }

    // ── Logos & caches ──────────────────────────────────────────────

    /// Warm the durable logo cache for every held token. Returns how many
    /// logos were newly resolved.
    pub async fn preload_logos(&self) -> usize {
        let state = self.snapshot();
        let requests: Vec<LogoRequest> = state
            .chains
            .iter()
            .flat_map(|chain| {
                chain
                    .tokens
                    .iter()
                    .filter(|t| !t.address.starts_with("unknown_"))
                    .map(move |t| LogoRequest::new(t.address.clone(), chain.chain_id, t.symbol.clone()))
            })
            .collect();
        self.logo_service.preload_tokens(&requests).await
    }

    /// Drop cached API responses and both logo tiers.
    pub fn clear_caches(&self) {
        if let Some(upstream) = &self.upstream {
            upstream.requests.clear_cache();
        }
        self.logo_service.clear_cache();
    }

    /// API response cache counts (all zero when no transport is configured).
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        match &self.upstream {
            Some(upstream) => upstream.requests.cache_stats(),
            None => {
                warn!("cache stats requested without a configured transport");
                CacheStats::default()
            }
        }
    }

    #[must_use]
    pub fn logo_cache_stats(&self) -> LogoCacheStats {
        self.logo_service.cache_stats()
    }
}
