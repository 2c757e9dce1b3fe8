//! Ranking key — configurable metric selector for portfolio ranking.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tradelens_core::MetricsReport;

/// Which `MetricsReport` field orders candidate portfolios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingKey {
    #[default]
    #[serde(alias = "netProfit")]
    NetProfit,
    #[serde(alias = "annualizedReturn")]
    AnnualizedReturn,
    #[serde(alias = "sharpeRatio")]
    SharpeRatio,
    #[serde(alias = "maxDrawdownPct")]
    MaxDrawdownPct,
    #[serde(alias = "profitFactor")]
    ProfitFactor,
    #[serde(alias = "recoveryFactor")]
    RecoveryFactor,
    #[serde(alias = "percentProfitable")]
    PercentProfitable,
}

impl RankingKey {
    pub const ALL: [RankingKey; 7] = [
        Self::NetProfit,
        Self::AnnualizedReturn,
        Self::SharpeRatio,
        Self::MaxDrawdownPct,
        Self::ProfitFactor,
        Self::RecoveryFactor,
        Self::PercentProfitable,
    ];

    /// Extract the ranked value, `None` when the metric is undefined.
    pub fn extract(&self, metrics: &MetricsReport) -> Option<f64> {
        let value = match self {
            Self::NetProfit => Some(metrics.net_profit),
            Self::AnnualizedReturn => metrics.annualized_return,
            Self::SharpeRatio => metrics.sharpe_ratio,
            Self::MaxDrawdownPct => metrics.max_drawdown_percent,
            Self::ProfitFactor => Some(metrics.profit_factor),
            Self::RecoveryFactor => Some(metrics.recovery_factor),
            Self::PercentProfitable => Some(metrics.percent_profitable),
        };
        value.filter(|v| !v.is_nan())
    }

    /// Ranked value with undefined metrics mapped to NaN.
    pub fn score(&self, metrics: &MetricsReport) -> f64 {
        self.extract(metrics).unwrap_or(f64::NAN)
    }

    /// Compare two scores. Returns true if `a` is better than `b`.
    ///
    /// `a > b` holds for every key: drawdown percentages are stored
    /// non-positive, so -5.0 beats -20.0.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NetProfit => "net_profit",
            Self::AnnualizedReturn => "annualized_return",
            Self::SharpeRatio => "sharpe_ratio",
            Self::MaxDrawdownPct => "max_drawdown_pct",
            Self::ProfitFactor => "profit_factor",
            Self::RecoveryFactor => "recovery_factor",
            Self::PercentProfitable => "percent_profitable",
        }
    }
}

impl fmt::Display for RankingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankingKey {
    type Err = String;

    /// Accepts both `snake_case` and `camelCase` names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|key| key.name().replace('_', "") == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown ranking key '{s}'. Valid: {}", valid.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradelens_core::{compute_metrics, TradeLedger};

    fn empty_report() -> MetricsReport {
        compute_metrics(&TradeLedger::empty(), 10_000.0).unwrap()
    }

    #[test]
    fn extract_net_profit() {
        let mut m = empty_report();
        m.net_profit = 1_250.0;
        assert_eq!(RankingKey::NetProfit.extract(&m), Some(1_250.0));
    }

    #[test]
    fn undefined_sharpe_scores_nan() {
        let m = empty_report();
        assert_eq!(RankingKey::SharpeRatio.extract(&m), None);
        assert!(RankingKey::SharpeRatio.score(&m).is_nan());
    }

    #[test]
    fn is_better_max_drawdown() {
        // -5% is better than -20% (less negative)
        assert!(RankingKey::MaxDrawdownPct.is_better(-5.0, -20.0));
        assert!(!RankingKey::MaxDrawdownPct.is_better(-20.0, -5.0));
    }

    #[test]
    fn default_is_net_profit() {
        assert_eq!(RankingKey::default(), RankingKey::NetProfit);
    }

    #[test]
    fn parse_accepts_both_spellings() {
        assert_eq!("sharpe_ratio".parse::<RankingKey>(), Ok(RankingKey::SharpeRatio));
        assert_eq!("maxDrawdownPct".parse::<RankingKey>(), Ok(RankingKey::MaxDrawdownPct));
        assert!("alpha".parse::<RankingKey>().is_err());
    }

    #[test]
    fn serde_accepts_camel_case_alias() {
        let key: RankingKey = serde_json::from_str("\"annualizedReturn\"").unwrap();
        assert_eq!(key, RankingKey::AnnualizedReturn);
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"annualized_return\"");
    }
}
