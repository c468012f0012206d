use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Symbol → percentage of total portfolio value (0–100).
pub type Allocations = BTreeMap<String, f64>;

/// Direction of a rebalancing trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceAction {
    /// Position is under target
    Buy,
    /// Position is over target
    Sell,
}

impl std::fmt::Display for RebalanceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebalanceAction::Buy => write!(f, "buy"),
            RebalanceAction::Sell => write!(f, "sell"),
        }
    }
}

/// A suggested trade bringing one symbol back to its target allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingSuggestion {
    /// Token symbol
    pub token: String,

    pub action: RebalanceAction,

    /// Current allocation in percent
    pub current_allocation: f64,

    /// Target allocation in percent
    pub target_allocation: f64,

    /// |current - target| in percentage points
    pub drift: f64,

    /// Notional USD to trade: drift / 100 × portfolio value
    pub suggested_amount: f64,
}

/// Outcome of a rebalancing check.
///
/// `max_drift` and `portfolio_value` are only reported when rebalancing is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingResult {
    pub needs_rebalancing: bool,
    pub max_drift: Option<f64>,
    pub suggestions: Vec<RebalancingSuggestion>,
    pub portfolio_value: Option<f64>,
}

impl RebalancingResult {
    pub fn balanced() -> Self {
        Self {
            needs_rebalancing: false,
            max_drift: None,
            suggestions: Vec::new(),
            portfolio_value: None,
        }
    }
}

/// Per-symbol drift against the target allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDrift {
    pub drifts: BTreeMap<String, f64>,
    pub max_drift: f64,
}

/// Result of validating a target allocation map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationValidation {
    pub is_valid: bool,
    pub total_percentage: f64,
    pub errors: Vec<String>,
}

/// Concentration measures over a set of allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityMetrics {
    pub number_of_assets: usize,

    /// Highest single allocation, in percent
    pub concentration_risk: f64,

    /// 0–100, higher is more diverse
    pub diversity_score: f64,

    /// Sum of squared allocation shares (0–1)
    pub herfindahl_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Profit/loss and dispersion of returns across positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_pnl: f64,
    pub average_roi: f64,

    /// Population standard deviation of ROI, × 100
    pub volatility_score: f64,

    pub risk_level: RiskLevel,
}

/// A position ranked by ROI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPerformer {
    pub symbol: String,
    pub value: f64,
    pub profit_loss: f64,
    pub roi: f64,
    /// 1-based rank
    pub rank: usize,
}
