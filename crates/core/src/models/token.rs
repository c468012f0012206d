use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single token position held by the wallet on one chain.
///
/// Built by the per-chain fetcher from an upstream holding record joined with
/// the chain's token list. Only holdings with a strictly positive `value`
/// ever make it into a [`ChainPortfolio`](super::portfolio::ChainPortfolio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// Contract address as reported upstream (chain-scoped)
    pub address: String,

    /// Ticker symbol (e.g., "USDC"), or "UNKNOWN"
    pub symbol: String,

    /// Display name, or "Unknown Token"
    pub name: String,

    /// Decimal precision of the token contract
    pub decimals: u8,

    /// Token amount held
    pub balance: f64,

    /// Unit price in USD
    pub price: f64,

    /// Position value in USD
    pub value: f64,

    /// Logo URL (never empty; falls back to a placeholder image)
    pub logo: String,

    /// Token standard, always "ERC20" for portfolio holdings
    pub protocol: String,

    /// Absolute profit/loss in USD
    pub profit_loss: f64,

    /// Profit/loss as a percentage (roi × 100)
    pub profit_loss_percent: f64,

    /// Return on investment as a ratio
    pub roi: f64,

    /// Human-readable balance (see `format::format_token_balance`)
    pub balance_formatted: String,

    pub last_updated: DateTime<Utc>,
}

/// Profit metrics of one held token, read from the published portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// `{chain_id}_{address}`
    pub index: String,
    pub profit_abs_usd: f64,
    pub roi: f64,
}

impl TokenMetrics {
    pub fn from_holding(chain_id: u64, holding: &TokenHolding) -> Self {
        Self {
            index: format!("{chain_id}_{}", holding.address),
            profit_abs_usd: holding.profit_loss,
            roi: holding.roi,
        }
    }
}
