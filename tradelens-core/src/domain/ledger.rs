//! TradeLedger — validated, exit-date ordered sequence of trades.

use serde::{Deserialize, Serialize};

use super::ids::StrategyId;
use super::trade::Trade;
use crate::error::CoreError;

/// Ordered list of closed trades for one strategy or a merged portfolio.
///
/// Construction validates every trade and stable-sorts by `exit_date`, so all
/// aggregation downstream can assume chronological order. Trades sharing an
/// exit date keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Trade>", into = "Vec<Trade>")]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn new(mut trades: Vec<Trade>) -> Result<Self, CoreError> {
        for (index, trade) in trades.iter().enumerate() {
            trade
                .validate()
                .map_err(|reason| CoreError::InvalidTrade { index, reason })?;
        }
        trades.sort_by_key(|t| t.exit_date);
        Ok(Self { trades })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    /// Sum of every trade's net profit.
    pub fn net_profit(&self) -> f64 {
        self.trades.iter().map(|t| t.net_profit).sum()
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}

impl TryFrom<Vec<Trade>> for TradeLedger {
    type Error = CoreError;

    fn try_from(trades: Vec<Trade>) -> Result<Self, Self::Error> {
        Self::new(trades)
    }
}

impl From<TradeLedger> for Vec<Trade> {
    fn from(ledger: TradeLedger) -> Self {
        ledger.trades
    }
}

impl<'a> IntoIterator for &'a TradeLedger {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

/// A strategy's ledger keyed by its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyLedger {
    pub id: StrategyId,
    pub ledger: TradeLedger,
}

impl StrategyLedger {
    pub fn new(id: impl Into<StrategyId>, ledger: TradeLedger) -> Self {
        Self {
            id: id.into(),
            ledger,
        }
    }
}

/// Combine ledgers with equal capital allocation.
///
/// Every trade of every member is scaled by `1 / members.len()` (size and net
/// profit) and the result is stable-merged by exit date. Ties on exit date keep
/// member order, then each member's own order.
pub fn merge_equal_weight(members: &[&TradeLedger]) -> TradeLedger {
    if members.is_empty() {
        return TradeLedger::empty();
    }
    let weight = 1.0 / members.len() as f64;
    let mut trades: Vec<Trade> = members
        .iter()
        .flat_map(|ledger| ledger.iter().map(|t| t.scaled(weight)))
        .collect();
    // Inputs are already validated ledgers; scaling by a positive finite
    // weight keeps every invariant, so only the ordering needs restoring.
    trades.sort_by_key(|t| t.exit_date);
    TradeLedger { trades }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn trade(exit: u32, net_profit: f64) -> Trade {
        Trade {
            entry_date: day(1),
            entry_price: 100.0,
            exit_date: day(exit),
            exit_price: 101.0,
            size: 10.0,
            net_profit,
        }
    }

    #[test]
    fn new_sorts_by_exit_date_stably() {
        let ledger = TradeLedger::new(vec![
            trade(5, 1.0),
            trade(2, 2.0),
            trade(5, 3.0),
            trade(3, 4.0),
        ])
        .unwrap();
        let pnl: Vec<f64> = ledger.iter().map(|t| t.net_profit).collect();
        assert_eq!(pnl, vec![2.0, 4.0, 1.0, 3.0]);
    }

    #[test]
    fn new_reports_index_of_bad_trade() {
        let mut bad = trade(2, 1.0);
        bad.exit_price = -1.0;
        let err = TradeLedger::new(vec![trade(1, 1.0), bad]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTrade { index: 1, .. }));
    }

    #[test]
    fn deserialize_validates() {
        let json = r#"[{"entry_date":"2024-01-05T00:00:00","entry_price":100.0,
            "exit_date":"2024-01-02T00:00:00","exit_price":101.0,"size":1.0,"net_profit":1.0}]"#;
        assert!(serde_json::from_str::<TradeLedger>(json).is_err());
    }

    #[test]
    fn merge_equal_weight_scales_and_interleaves() {
        let a = TradeLedger::new(vec![trade(1, 100.0), trade(4, 40.0)]).unwrap();
        let b = TradeLedger::new(vec![trade(2, -50.0)]).unwrap();
        let merged = merge_equal_weight(&[&a, &b]);

        let pnl: Vec<f64> = merged.iter().map(|t| t.net_profit).collect();
        assert_eq!(pnl, vec![50.0, -25.0, 20.0]);
        assert!(merged.iter().all(|t| t.size == 5.0));
    }

    #[test]
    fn merge_ties_keep_member_order() {
        let a = TradeLedger::new(vec![trade(3, 10.0)]).unwrap();
        let b = TradeLedger::new(vec![trade(3, 20.0)]).unwrap();
        let merged = merge_equal_weight(&[&b, &a]);
        let pnl: Vec<f64> = merged.iter().map(|t| t.net_profit).collect();
        assert_eq!(pnl, vec![10.0, 5.0]);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        assert!(merge_equal_weight(&[]).is_empty());
    }
}
