use std::collections::BTreeMap;

use crate::models::portfolio::ChainPortfolio;
use crate::models::rebalancing::{
    AllocationValidation, Allocations, DiversityMetrics, PortfolioDrift, RankedPerformer,
    RebalanceAction, RebalancingResult, RebalancingSuggestion, RiskLevel, RiskMetrics,
};
use crate::models::token::TokenHolding;

pub const DEFAULT_DRIFT_THRESHOLD: f64 = 5.0;
pub const DEFAULT_PERFORMER_LIMIT: usize = 5;

/// Tolerance on the 100% total when validating target allocations.
const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Allocation, drift and rebalancing math.
///
/// Pure functions over allocations and holdings; no I/O.
pub struct RebalancingService;

impl RebalancingService {
    pub fn new() -> Self {
        Self
    }

    /// Percent of `total_value` held per symbol, summed across chains.
    ///
    /// Returns an empty map when `total_value` is not positive.
    pub fn calculate_current_allocations(
        &self,
        chains: &[ChainPortfolio],
        total_value: f64,
    ) -> Allocations {
        let mut allocations = Allocations::new();
        if total_value <= 0.0 {
            return allocations;
        }
        for token in chains.iter().flat_map(|c| c.tokens.iter()) {
            *allocations.entry(token.symbol.clone()).or_insert(0.0) +=
                token.value / total_value * 100.0;
        }
        allocations
    }

    /// Absolute drift per target symbol; symbols not held count as 0%.
    pub fn calculate_portfolio_drift(
        &self,
        current: &Allocations,
        target: &Allocations,
    ) -> PortfolioDrift {
        let mut drifts = BTreeMap::new();
        let mut max_drift: f64 = 0.0;
        for (token, target_pct) in target {
            let current_pct = current.get(token).copied().unwrap_or(0.0);
            let drift = (current_pct - target_pct).abs();
            drifts.insert(token.clone(), drift);
            max_drift = max_drift.max(drift);
        }
        PortfolioDrift { drifts, max_drift }
    }

    /// Trades that bring the portfolio back to `target`.
    ///
    /// Nothing is suggested unless the largest drift reaches `threshold`; once
    /// it does, every symbol whose drift reaches it gets a suggestion.
    pub fn generate_rebalancing_suggestions(
        &self,
        current: &Allocations,
        target: &Allocations,
        portfolio_value: f64,
        threshold: f64,
    ) -> RebalancingResult {
        let PortfolioDrift { drifts, max_drift } = self.calculate_portfolio_drift(current, target);
        if max_drift < threshold {
            return RebalancingResult::balanced();
        }

        let suggestions = drifts
            .into_iter()
            .filter(|(_, drift)| *drift >= threshold)
            .map(|(token, drift)| {
                let current_allocation = current.get(&token).copied().unwrap_or(0.0);
                let target_allocation = target.get(&token).copied().unwrap_or(0.0);
                let action = if current_allocation > target_allocation {
                    RebalanceAction::Sell
                } else {
                    RebalanceAction::Buy
                };
                RebalancingSuggestion {
                    token,
                    action,
                    current_allocation,
                    target_allocation,
                    drift,
                    suggested_amount: drift / 100.0 * portfolio_value,
                }
            })
            .collect();

        RebalancingResult {
            needs_rebalancing: true,
            max_drift: Some(max_drift),
            suggestions,
            portfolio_value: Some(portfolio_value),
        }
    }

    /// Targets must sum to 100% (±0.01) and each lie within 0..=100.
    pub fn validate_target_allocations(&self, target: &Allocations) -> AllocationValidation {
        let total_percentage: f64 = target.values().sum();
        let mut errors = Vec::new();

        if (total_percentage - 100.0).abs() > ALLOCATION_TOLERANCE {
            errors.push(format!(
                "Total allocation is {total_percentage:.2}%, should be 100%"
            ));
        }
        for (token, allocation) in target {
            if *allocation < 0.0 {
                errors.push(format!("{token} has negative allocation: {allocation}%"));
            }
            if *allocation > 100.0 {
                errors.push(format!("{token} allocation exceeds 100%: {allocation}%"));
            }
        }

        AllocationValidation {
            is_valid: errors.is_empty(),
            total_percentage,
            errors,
        }
    }

    pub fn calculate_portfolio_diversity(&self, allocations: &Allocations) -> DiversityMetrics {
        if allocations.is_empty() {
            return DiversityMetrics {
                number_of_assets: 0,
                concentration_risk: 0.0,
                diversity_score: 0.0,
                herfindahl_index: 0.0,
            };
        }

        let concentration_risk = allocations.values().copied().fold(f64::MIN, f64::max);
        let herfindahl_index = allocations
            .values()
            .map(|pct| {
                let share = pct / 100.0;
                share * share
            })
            .sum();

        DiversityMetrics {
            number_of_assets: allocations.len(),
            concentration_risk,
            diversity_score: (100.0 - concentration_risk).max(0.0),
            herfindahl_index,
        }
    }

    /// Total P&L, mean ROI and ROI dispersion across positions.
    ///
    /// Volatility is the population standard deviation of ROI × 100:
    /// below 10 is Low, below 25 Medium, otherwise High.
    pub fn calculate_risk_metrics(&self, tokens: &[TokenHolding]) -> RiskMetrics {
        if tokens.is_empty() {
            return RiskMetrics {
                total_pnl: 0.0,
                average_roi: 0.0,
                volatility_score: 0.0,
                risk_level: RiskLevel::Low,
            };
        }

        let n = tokens.len() as f64;
        let total_pnl = tokens.iter().map(|t| t.profit_loss).sum();
        let average_roi = tokens.iter().map(|t| t.roi).sum::<f64>() / n;
        let variance = tokens
            .iter()
            .map(|t| (t.roi - average_roi).powi(2))
            .sum::<f64>()
            / n;
        let volatility_score = variance.sqrt() * 100.0;

        let risk_level = if volatility_score < 10.0 {
            RiskLevel::Low
        } else if volatility_score < 25.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        };

        RiskMetrics {
            total_pnl,
            average_roi,
            volatility_score,
            risk_level,
        }
    }

    /// Best `limit` positions by ROI, ranked from 1.
    pub fn top_performers(&self, tokens: &[TokenHolding], limit: usize) -> Vec<RankedPerformer> {
        let mut sorted: Vec<&TokenHolding> = tokens.iter().collect();
        sorted.sort_by(|a, b| b.roi.total_cmp(&a.roi));
        rank(sorted, limit)
    }

    /// Worst `limit` positions by ROI, ranked from 1.
    pub fn worst_performers(&self, tokens: &[TokenHolding], limit: usize) -> Vec<RankedPerformer> {
        let mut sorted: Vec<&TokenHolding> = tokens.iter().collect();
        sorted.sort_by(|a, b| a.roi.total_cmp(&b.roi));
        rank(sorted, limit)
    }
}

impl Default for RebalancingService {
    fn default() -> Self {
        Self::new()
    }
}

fn rank(sorted: Vec<&TokenHolding>, limit: usize) -> Vec<RankedPerformer> {
    sorted
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, t)| RankedPerformer {
            symbol: t.symbol.clone(),
            value: t.value,
            profit_loss: t.profit_loss,
            roi: t.roi,
            rank: i + 1,
        })
        .collect()
}
