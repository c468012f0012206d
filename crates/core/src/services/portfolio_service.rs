use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::errors::CoreError;
use crate::format::format_token_balance;
use crate::models::chain::{is_supported, SUPPORTED_CHAINS};
use crate::models::portfolio::{ChainPortfolio, MultiChainPortfolio, PortfolioSummary, PortfolioValue};
use crate::models::token::TokenHolding;
use crate::models::upstream::{HoldingRecord, HoldingsResponse, TokenListResponse, TokenMetadata};
use crate::providers::traits::RequestParams;
use super::logo_service::LogoService;
use super::request_service::{RequestOptions, RequestService};

pub const HOLDINGS_ENDPOINT: &str = "portfolio/portfolio/v4/overview/erc20/details";
pub const DEFAULT_TIMERANGE: &str = "1week";
pub const DEFAULT_MIN_TOKEN_VALUE: f64 = 0.01;

const DEFAULT_SYMBOL: &str = "UNKNOWN";
const DEFAULT_NAME: &str = "Unknown Token";
const DEFAULT_DECIMALS: u8 = 18;
const TOKEN_PROTOCOL: &str = "ERC20";

pub fn token_list_endpoint(chain_id: u64) -> String {
    format!("token/v1.2/{chain_id}/token-list")
}

/// First non-empty value among the holding record, the token metadata, and the default.
pub fn resolve_field(record: Option<&str>, metadata: Option<&str>, default: &str) -> String {
    record
        .filter(|v| !v.is_empty())
        .or_else(|| metadata.filter(|v| !v.is_empty()))
        .unwrap_or(default)
        .to_string()
}

/// Token list keyed by lowercased contract address.
pub fn metadata_map(list: TokenListResponse) -> HashMap<String, TokenMetadata> {
    list.tokens
        .into_iter()
        .map(|(address, meta)| (address.to_lowercase(), meta))
        .collect()
}

/// Fetches ERC-20 holdings per chain and aggregates them across every supported chain.
///
/// Failures are contained at the smallest scope: a failed token list only
/// costs metadata, a failed holdings call only zeroes that chain.
pub struct PortfolioService {
    requests: Arc<RequestService>,
    logos: Arc<LogoService>,
    clock: Arc<dyn Clock>,
    timerange: String,
}

impl PortfolioService {
    pub fn new(requests: Arc<RequestService>, logos: Arc<LogoService>) -> Self {
        Self::with_clock(requests, logos, Arc::new(SystemClock), DEFAULT_TIMERANGE)
    }

    pub fn with_clock(
        requests: Arc<RequestService>,
        logos: Arc<LogoService>,
        clock: Arc<dyn Clock>,
        timerange: impl Into<String>,
    ) -> Self {
        Self {
            requests,
            logos,
            clock,
            timerange: timerange.into(),
        }
    }

    // ── Per-chain fetch ─────────────────────────────────────────────

    /// Holdings of `wallet_address` on one chain; never fails.
    ///
    /// Unsupported chains and failed holdings calls both yield an empty result.
    pub async fn get_portfolio_value(&self, chain_id: u64, wallet_address: &str) -> PortfolioValue {
        match self.fetch_chain(chain_id, wallet_address).await {
            Ok(value) => value,
            Err(e) => {
                warn!(chain_id, error = %e, "portfolio fetch failed, using empty chain");
                PortfolioValue::empty()
            }
        }
    }

    /// Like [`get_portfolio_value`](Self::get_portfolio_value) but reports a
    /// failed holdings call instead of swallowing it.
    pub async fn fetch_chain(
        &self,
        chain_id: u64,
        wallet_address: &str,
    ) -> Result<PortfolioValue, CoreError> {
        if !is_supported(chain_id) {
            debug!(chain_id, "chain not supported, skipping");
            return Ok(PortfolioValue::empty());
        }

        let holdings_params = RequestService::portfolio_params(
            wallet_address,
            chain_id,
            &self.timerange,
            &RequestParams::new(),
        );
        let list_endpoint = token_list_endpoint(chain_id);
        let mut list_params = RequestParams::new();
        list_params.insert("provider".into(), "1inch".into());

        let (holdings, token_list) = tokio::join!(
            self.requests
                .make_request(HOLDINGS_ENDPOINT, &holdings_params, RequestOptions::default()),
            self.requests
                .make_request(&list_endpoint, &list_params, RequestOptions::default()),
        );

        let records = HoldingsResponse::parse(holdings?)?.into_records()?;

        let metadata = match token_list.and_then(TokenListResponse::parse) {
            Ok(list) => metadata_map(list),
            Err(e) => {
                warn!(chain_id, error = %e, "token list unavailable, using default metadata");
                HashMap::new()
            }
        };

        Ok(self.process_token_details(records, &metadata, chain_id).await)
    }

    /// Join holding records with token metadata and resolve logos.
    ///
    /// Records reporting a different chain are ignored; only positions with a
    /// strictly positive value are kept.
    pub async fn process_token_details(
        &self,
        records: Vec<HoldingRecord>,
        metadata: &HashMap<String, TokenMetadata>,
        chain_id: u64,
    ) -> PortfolioValue {
        let now = self.clock.now();

        let holdings: Vec<TokenHolding> = records
            .into_iter()
            .filter(|r| r.chain_id.map_or(true, |id| id == chain_id))
            .map(|record| build_holding(record, metadata, chain_id, now))
            .filter(|token| token.value > 0.0)
            .collect();

        let logos = join_all(holdings.iter().map(|token| {
            let lookup_address = if token.address.starts_with("unknown_") {
                ""
            } else {
                token.address.as_str()
            };
            self.logos
                .get_token_logo(lookup_address, chain_id, &token.symbol)
        }))
        .await;

        let tokens: Vec<TokenHolding> = holdings
            .into_iter()
            .zip(logos)
            .map(|(mut token, logo)| {
                token.logo = logo;
                token
            })
            .collect();

        let total_value: f64 = tokens.iter().map(|t| t.value).sum();
        PortfolioValue {
            total_value,
            tokens,
        }
    }

    // ── Multi-chain aggregation ─────────────────────────────────────

    /// Fetch every supported chain concurrently.
    ///
    /// Never fails: a chain whose fetch errors becomes a zero-value entry and
    /// is listed in `degraded_chains`. Chains keep supported-table order.
    pub async fn get_multi_chain_portfolio(&self, wallet_address: &str) -> MultiChainPortfolio {
        info!(chains = SUPPORTED_CHAINS.len(), "fetching multi-chain portfolio");

        let results = join_all(SUPPORTED_CHAINS.iter().map(|chain| async move {
            (chain, self.fetch_chain(chain.id, wallet_address).await)
        }))
        .await;

        let mut degraded_chains = Vec::new();
        let chains: Vec<ChainPortfolio> = results
            .into_iter()
            .map(|(chain, result)| match result {
                Ok(value) => ChainPortfolio {
                    chain_id: chain.id,
                    chain_name: chain.name.to_string(),
                    total_value: value.total_value,
                    tokens: value.tokens,
                },
                Err(e) => {
                    warn!(chain = chain.name, error = %e, "chain fetch failed, zeroing");
                    degraded_chains.push(chain.id);
                    ChainPortfolio::empty(chain.id, chain.name)
                }
            })
            .collect();

        let total_value: f64 = chains.iter().map(|c| c.total_value).sum();
        info!(
            total_value,
            degraded = degraded_chains.len(),
            "multi-chain portfolio fetched"
        );

        MultiChainPortfolio {
            wallet_address: wallet_address.to_string(),
            total_value,
            chains,
            degraded_chains,
            fetched_at: self.clock.now(),
        }
    }

    // ── Derived views ───────────────────────────────────────────────

    /// Tokens worth at least `min_value` USD.
    pub fn filter_tokens_by_value(tokens: &[TokenHolding], min_value: f64) -> Vec<TokenHolding> {
        tokens
            .iter()
            .filter(|t| t.value >= min_value)
            .cloned()
            .collect()
    }

    /// Tokens ordered by value, largest first.
    pub fn sort_tokens_by_value(tokens: &[TokenHolding]) -> Vec<TokenHolding> {
        let mut sorted = tokens.to_vec();
        sorted.sort_by(|a, b| b.value.total_cmp(&a.value));
        sorted
    }

    /// The holding of `address` (case-insensitive) on `chain_id`, if any.
    pub fn find_token<'a>(
        chains: &'a [ChainPortfolio],
        chain_id: u64,
        address: &str,
    ) -> Option<&'a TokenHolding> {
        chains
            .iter()
            .find(|c| c.chain_id == chain_id)?
            .tokens
            .iter()
            .find(|t| t.address.eq_ignore_ascii_case(address))
    }

    pub fn summarize(portfolio: &MultiChainPortfolio) -> PortfolioSummary {
        Self::summarize_chains(&portfolio.chains, portfolio.total_value)
    }

    /// Headline numbers over a set of chains worth `total_value` in total.
    pub fn summarize_chains(chains: &[ChainPortfolio], total_value: f64) -> PortfolioSummary {
        let all_tokens: Vec<&TokenHolding> = chains.iter().flat_map(|c| c.tokens.iter()).collect();
        let total_tokens = all_tokens.len();
        let total_chains = chains.iter().filter(|c| !c.tokens.is_empty()).count();
        let average_token_value = if total_tokens > 0 {
            total_value / total_tokens as f64
        } else {
            0.0
        };

        // First strictly-largest position wins ties
        let mut largest_holding: Option<&TokenHolding> = None;
        for &token in &all_tokens {
            let best = largest_holding.map_or(0.0, |t| t.value);
            if token.value > best {
                largest_holding = Some(token);
            }
        }

        let mut chain_distribution = BTreeMap::new();
        if total_value > 0.0 {
            for chain in chains.iter().filter(|c| c.total_value > 0.0) {
                chain_distribution.insert(
                    chain.chain_name.clone(),
                    chain.total_value / total_value * 100.0,
                );
            }
        }

        PortfolioSummary {
            total_tokens,
            total_chains,
            average_token_value,
            largest_holding: largest_holding.cloned(),
            chain_distribution,
        }
    }
}

fn build_holding(
    record: HoldingRecord,
    metadata: &HashMap<String, TokenMetadata>,
    chain_id: u64,
    now: chrono::DateTime<chrono::Utc>,
) -> TokenHolding {
    let meta = record
        .contract_address
        .as_deref()
        .and_then(|addr| metadata.get(&addr.to_lowercase()));

    let symbol = resolve_field(
        record.symbol.as_deref(),
        meta.and_then(|m| m.symbol.as_deref()),
        DEFAULT_SYMBOL,
    );
    let name = resolve_field(
        record.name.as_deref(),
        meta.and_then(|m| m.name.as_deref()),
        DEFAULT_NAME,
    );
    let decimals = meta
        .and_then(|m| m.decimals)
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_DECIMALS);

    let balance = record.amount.unwrap_or(0.0);
    let price = record.price_to_usd.unwrap_or(0.0);
    let value = record.value_usd.unwrap_or(balance * price);
    let roi = record.roi.unwrap_or(0.0);

    let address = record
        .contract_address
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| format!("unknown_{chain_id}"));

    TokenHolding {
        address,
        symbol,
        name,
        decimals,
        balance,
        price,
        value,
        logo: String::new(),
        protocol: TOKEN_PROTOCOL.to_string(),
        profit_loss: record.abs_profit_usd.unwrap_or(0.0),
        profit_loss_percent: roi * 100.0,
        roi,
        balance_formatted: format_token_balance(balance, decimals),
        last_updated: now,
    }
}
