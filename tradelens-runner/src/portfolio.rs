//! Portfolio candidates — a subset of strategies merged with equal weight.

use serde::{Deserialize, Serialize};
use tradelens_core::{
    merge_equal_weight, CoreError, MetricsReport, StrategyId, StrategyLedger, TradeLedger,
};

use crate::ranking::RankingKey;

/// A named subset of strategies with its merged ledger and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioCandidate {
    /// Member strategies in input order.
    pub members: Vec<StrategyId>,
    /// Capital share of each member (`1 / members.len()`).
    pub allocation: f64,
    pub trades: TradeLedger,
    pub metrics: MetricsReport,
    /// Ranking value under the key the candidate was scored with (NaN if undefined).
    #[serde(with = "tradelens_core::float_sentinel")]
    pub score: f64,
}

impl PortfolioCandidate {
    pub fn name(&self) -> String {
        self.members
            .iter()
            .map(StrategyId::as_str)
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Whether both candidates hold the same member set, regardless of order.
    pub fn same_members(&self, other: &PortfolioCandidate) -> bool {
        if self.members.len() != other.members.len() {
            return false;
        }
        let mut a: Vec<&StrategyId> = self.members.iter().collect();
        let mut b: Vec<&StrategyId> = other.members.iter().collect();
        a.sort();
        b.sort();
        a == b
    }
}

/// Merge the strategies at `indices` with equal weight and score the result.
///
/// `indices` are positions in `strategies`; they are canonicalised to
/// ascending order so a member set always merges the same way.
pub fn evaluate_portfolio(
    strategies: &[StrategyLedger],
    indices: &[usize],
    total_capital: f64,
    key: RankingKey,
) -> Result<PortfolioCandidate, CoreError> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ledgers: Vec<&TradeLedger> = Vec::with_capacity(sorted.len());
    let mut members = Vec::with_capacity(sorted.len());
    for &i in &sorted {
        let strategy = strategies.get(i).ok_or_else(|| {
            CoreError::parameter(
                "indices",
                format!("strategy index {i} out of range ({})", strategies.len()),
            )
        })?;
        ledgers.push(&strategy.ledger);
        members.push(strategy.id.clone());
    }

    let trades = merge_equal_weight(&ledgers);
    let metrics = MetricsReport::compute(&trades, total_capital)?;
    Ok(PortfolioCandidate {
        allocation: if members.is_empty() {
            0.0
        } else {
            1.0 / members.len() as f64
        },
        members,
        trades,
        score: key.score(&metrics),
        metrics,
    })
}
