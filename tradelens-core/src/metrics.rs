//! Performance metrics — a trade ledger evaluated against an initial capital.
//!
//! `MetricsReport::compute` makes a single forward pass over the exit-ordered
//! ledger. Every helper below is a pure function: trades in, scalar out.
//!
//! Sentinel conventions:
//! - `profit_factor`, `recovery_factor`, `ratio_avg_win_avg_loss`: `+inf` when
//!   the denominator is zero and the numerator positive, `0.0` when both are zero.
//! - `sharpe_ratio`: `None` with fewer than two traded months or a zero monthly
//!   standard deviation.
//! - Capital-relative percentages: `None` when the initial capital is zero.
//! - Zero-profit trades neither extend nor break a win/loss streak.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::aggregate::{mean, profit_factor, recovery_factor, std_dev, ProfitTracker};
use crate::domain::{Trade, TradeLedger};
use crate::error::CoreError;

const MIN_STD_DEV: f64 = 1e-12;
const DAYS_PER_YEAR: f64 = 365.25;

/// Read-only snapshot of a ledger's performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub initial_capital: f64,

    // ── Profit & loss ──
    pub net_profit: f64,
    pub gross_profit: f64,
    /// Sum of losing trades, stored non-positive.
    pub gross_loss: f64,
    #[serde(with = "crate::float_sentinel")]
    pub profit_factor: f64,
    pub total_return_pct: Option<f64>,
    pub annualized_return: Option<f64>,

    // ── Trade counts ──
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub even_trades: usize,
    pub percent_profitable: f64,

    // ── Per-trade ──
    pub avg_trade_net_profit: f64,
    pub avg_winning_trade: f64,
    pub avg_losing_trade: f64,
    #[serde(with = "crate::float_sentinel")]
    pub ratio_avg_win_avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    // ── Path ──
    /// Worst peak-to-trough decline in cumulative profit, stored non-positive.
    pub max_drawdown_dollar: f64,
    /// Worst decline relative to the running profit peak, stored non-positive.
    /// `None` until cumulative profit has been positive.
    pub max_drawdown_percent: Option<f64>,
    /// Worst decline relative to peak equity (capital + profit peak).
    pub max_drawdown_equity_percent: Option<f64>,
    pub max_runup: f64,
    #[serde(with = "crate::float_sentinel")]
    pub recovery_factor: f64,

    // ── Monthly ──
    pub months_traded: usize,
    pub average_monthly_profit: f64,
    pub std_dev_monthly_profit: f64,
    pub average_monthly_return_pct: Option<f64>,
    pub percent_profitable_months: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub monthly: Vec<MonthlyResult>,
}

/// Net result of the trades that exited in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyResult {
    pub year: i32,
    pub month: u32,
    pub trades: usize,
    pub net_profit: f64,
    pub return_pct: Option<f64>,
}

impl MetricsReport {
    /// Compute every metric for `ledger` against `initial_capital`.
    ///
    /// An empty ledger yields a report of zeros and `None`s. Negative or
    /// non-finite capital is rejected; zero capital is accepted and flags every
    /// capital-relative percentage as `None`.
    pub fn compute(ledger: &TradeLedger, initial_capital: f64) -> Result<Self, CoreError> {
        if !initial_capital.is_finite() || initial_capital < 0.0 {
            return Err(CoreError::InvalidCapital(initial_capital));
        }
        let trades = ledger.trades();

        let mut tracker = ProfitTracker::new(initial_capital);
        let mut winning_trades = 0;
        let mut losing_trades = 0;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        for trade in trades {
            tracker.push(trade.net_profit);
            if trade.is_winner() {
                winning_trades += 1;
                largest_win = largest_win.max(trade.net_profit);
            } else if trade.is_loser() {
                losing_trades += 1;
                largest_loss = largest_loss.min(trade.net_profit);
            }
        }

        let total_trades = trades.len();
        let net_profit = tracker.cumulative();
        let gross_profit = tracker.gross_profit();
        let gross_loss = tracker.gross_loss();
        let avg_winning_trade = per_trade(gross_profit, winning_trades);
        let avg_losing_trade = per_trade(gross_loss, losing_trades);

        let monthly = monthly_breakdown(trades, initial_capital);
        let monthly_profits: Vec<f64> = monthly.iter().map(|m| m.net_profit).collect();
        let average_monthly_profit = mean(&monthly_profits);
        let std_dev_monthly_profit = std_dev(&monthly_profits);

        Ok(Self {
            initial_capital,
            net_profit,
            gross_profit,
            gross_loss,
            profit_factor: tracker.profit_factor(),
            total_return_pct: pct_of_capital(net_profit, initial_capital),
            annualized_return: annualized_return(trades, initial_capital, net_profit),
            total_trades,
            winning_trades,
            losing_trades,
            even_trades: total_trades - winning_trades - losing_trades,
            percent_profitable: if total_trades == 0 {
                0.0
            } else {
                winning_trades as f64 / total_trades as f64 * 100.0
            },
            avg_trade_net_profit: per_trade(net_profit, total_trades),
            avg_winning_trade,
            avg_losing_trade,
            ratio_avg_win_avg_loss: profit_factor(avg_winning_trade, avg_losing_trade),
            largest_win,
            largest_loss,
            avg_holding_days: avg_holding_days(trades),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            max_drawdown_dollar: tracker.max_drawdown(),
            max_drawdown_percent: tracker.max_drawdown_pct(),
            max_drawdown_equity_percent: tracker.max_drawdown_equity_pct(),
            max_runup: tracker.max_runup(),
            recovery_factor: recovery_factor(net_profit, tracker.max_drawdown()),
            months_traded: monthly.len(),
            average_monthly_profit,
            std_dev_monthly_profit,
            average_monthly_return_pct: if monthly.is_empty() {
                None
            } else {
                pct_of_capital(average_monthly_profit, initial_capital)
            },
            percent_profitable_months: percent_profitable_months(&monthly),
            sharpe_ratio: monthly_sharpe(&monthly_profits),
            monthly,
        })
    }
}

/// Free-function form of [`MetricsReport::compute`].
pub fn compute_metrics(ledger: &TradeLedger, initial_capital: f64) -> Result<MetricsReport, CoreError> {
    MetricsReport::compute(ledger, initial_capital)
}

// ─── Individual metric functions ────────────────────────────────────

/// Drawdown (<= 0) after each trade of the ledger.
pub fn drawdown_curve(trades: &[Trade]) -> Vec<f64> {
    let mut tracker = ProfitTracker::new(0.0);
    trades.iter().map(|t| tracker.push(t.net_profit)).collect()
}

/// Cumulative profit after each trade of the ledger.
pub fn cumulative_profit_curve(trades: &[Trade]) -> Vec<f64> {
    let mut total = 0.0;
    trades
        .iter()
        .map(|t| {
            total += t.net_profit;
            total
        })
        .collect()
}

/// Maximum consecutive winning trades.
pub fn max_consecutive_wins(trades: &[Trade]) -> usize {
    max_consecutive(trades, true)
}

/// Maximum consecutive losing trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    max_consecutive(trades, false)
}

/// Group trades by exit month, oldest first.
pub fn monthly_breakdown(trades: &[Trade], initial_capital: f64) -> Vec<MonthlyResult> {
    let mut buckets: BTreeMap<(i32, u32), (usize, f64)> = BTreeMap::new();
    for trade in trades {
        let key = (trade.exit_date.year(), trade.exit_date.month());
        let bucket = buckets.entry(key).or_insert((0, 0.0));
        bucket.0 += 1;
        bucket.1 += trade.net_profit;
    }
    buckets
        .into_iter()
        .map(|((year, month), (count, net_profit))| MonthlyResult {
            year,
            month,
            trades: count,
            net_profit,
            return_pct: pct_of_capital(net_profit, initial_capital),
        })
        .collect()
}

/// Mean monthly profit over its sample standard deviation.
pub fn monthly_sharpe(monthly_profits: &[f64]) -> Option<f64> {
    if monthly_profits.len() < 2 {
        return None;
    }
    let sd = std_dev(monthly_profits);
    if sd < MIN_STD_DEV {
        return None;
    }
    Some(mean(monthly_profits) / sd)
}

/// Compound annual return in percent, from the earliest entry to the last exit.
///
/// `None` for zero capital or a span shorter than one day; `-100.0` once the
/// account has been wiped out.
pub fn annualized_return(trades: &[Trade], initial_capital: f64, net_profit: f64) -> Option<f64> {
    if initial_capital <= 0.0 {
        return None;
    }
    let first_entry = trades.iter().map(|t| t.entry_date).min()?;
    let last_exit = trades.iter().map(|t| t.exit_date).max()?;
    let days = (last_exit - first_entry).num_seconds() as f64 / 86_400.0;
    if days < 1.0 {
        return None;
    }
    let ending = initial_capital + net_profit;
    if ending <= 0.0 {
        return Some(-100.0);
    }
    let annualized = ((ending / initial_capital).powf(DAYS_PER_YEAR / days) - 1.0) * 100.0;
    annualized.is_finite().then_some(annualized)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.is_even() {
            continue;
        }
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

fn percent_profitable_months(monthly: &[MonthlyResult]) -> Option<f64> {
    if monthly.is_empty() {
        return None;
    }
    let up = monthly.iter().filter(|m| m.net_profit > 0.0).count();
    Some(up as f64 / monthly.len() as f64 * 100.0)
}

fn avg_holding_days(trades: &[Trade]) -> f64 {
    let days: Vec<f64> = trades.iter().map(Trade::holding_days).collect();
    mean(&days)
}

fn per_trade(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn pct_of_capital(value: f64, initial_capital: f64) -> Option<f64> {
    (initial_capital > 0.0).then(|| value / initial_capital * 100.0)
}
