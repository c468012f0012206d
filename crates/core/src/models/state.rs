use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::portfolio::ChainPortfolio;
use super::rebalancing::{Allocations, RebalancingSuggestion};

/// Snapshot of everything a presentation layer renders.
///
/// The tracker never mutates a published snapshot: every change builds a new
/// `PortfolioState` and swaps it in whole, so readers see either the old or
/// the new state and nothing in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub wallet_address: Option<String>,

    /// Sum over `chains`
    pub total_value: f64,

    pub chains: Vec<ChainPortfolio>,

    pub is_loading: bool,

    /// The single channel for terminal failures (configuration, missing input)
    pub error: Option<String>,

    /// When `chains` was last replaced by a successful fetch
    pub last_updated: Option<DateTime<Utc>>,

    pub target_allocations: Allocations,

    pub drift_threshold: f64,

    pub rebalancing_suggestions: Vec<RebalancingSuggestion>,

    pub needs_rebalancing: bool,

    pub max_drift: f64,

    /// Chains zeroed in the last fetch because their upstream call failed
    pub degraded_chains: Vec<u64>,
}

impl PortfolioState {
    pub fn new(target_allocations: Allocations, drift_threshold: f64) -> Self {
        Self {
            wallet_address: None,
            total_value: 0.0,
            chains: Vec::new(),
            is_loading: false,
            error: None,
            last_updated: None,
            target_allocations,
            drift_threshold,
            rebalancing_suggestions: Vec::new(),
            needs_rebalancing: false,
            max_drift: 0.0,
            degraded_chains: Vec::new(),
        }
    }
}
