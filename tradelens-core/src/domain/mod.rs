//! Domain types for TradeLens

pub mod ids;
pub mod ledger;
pub mod trade;

pub use ids::StrategyId;
pub use ledger::{merge_equal_weight, StrategyLedger, TradeLedger};
pub use trade::Trade;
