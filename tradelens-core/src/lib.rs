//! TradeLens Core — trade ledgers, profit aggregation and performance metrics.
//!
//! This crate contains the numeric heart of the analytics stack:
//! - Domain types (trades, validated exit-ordered ledgers, strategy ids)
//! - Equal-weight merging of strategy ledgers into a portfolio ledger
//! - A single-pass profit tracker shared by metrics and Monte Carlo paths
//! - The metrics engine (`MetricsReport`)
//! - A deterministic, hash-derived RNG hierarchy

pub mod aggregate;
pub mod domain;
pub mod error;
pub mod float_sentinel;
pub mod metrics;
pub mod rng;

pub use aggregate::ProfitTracker;
pub use domain::{merge_equal_weight, StrategyId, StrategyLedger, Trade, TradeLedger};
pub use error::CoreError;
pub use metrics::{compute_metrics, MetricsReport, MonthlyResult};
pub use rng::RngHierarchy;
