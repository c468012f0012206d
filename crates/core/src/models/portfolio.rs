use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::token::TokenHolding;

/// Result of fetching one chain: its positive-value tokens and their sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValue {
    pub total_value: f64,
    pub tokens: Vec<TokenHolding>,
}

impl PortfolioValue {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Holdings of the wallet on a single chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainPortfolio {
    pub chain_id: u64,
    pub chain_name: String,

    /// Sum of `tokens[*].value`
    pub total_value: f64,

    pub tokens: Vec<TokenHolding>,
}

impl ChainPortfolio {
    /// Zero-value placeholder for a chain with no holdings or a failed fetch.
    pub fn empty(chain_id: u64, chain_name: impl Into<String>) -> Self {
        Self {
            chain_id,
            chain_name: chain_name.into(),
            total_value: 0.0,
            tokens: Vec::new(),
        }
    }
}

/// Aggregated holdings of one wallet across every supported chain.
///
/// Replaced wholesale on every fetch; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiChainPortfolio {
    /// The wallet address this portfolio was fetched for
    pub wallet_address: String,

    /// Sum of `chains[*].total_value`
    pub total_value: f64,

    /// One entry per supported chain, in supported-chain table order
    pub chains: Vec<ChainPortfolio>,

    /// Chains whose fetch failed and were zeroed
    #[serde(default)]
    pub degraded_chains: Vec<u64>,

    pub fetched_at: DateTime<Utc>,
}

/// Headline numbers derived from a [`MultiChainPortfolio`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Number of token positions across all chains
    pub total_tokens: usize,

    /// Number of chains holding at least one token
    pub total_chains: usize,

    /// Portfolio value divided by the number of positions
    pub average_token_value: f64,

    /// The single most valuable position, if any
    pub largest_holding: Option<TokenHolding>,

    /// Chain name → percent of portfolio value (only chains with value)
    pub chain_distribution: BTreeMap<String, f64>,
}
