//! Profit-path aggregation shared by the metrics and Monte Carlo engines.
//!
//! A `ProfitTracker` walks a sequence of trade profits once and keeps the
//! running cumulative profit, its peak and trough, gross gains and losses, and
//! the worst drawdown / best runup seen so far.

use serde::{Deserialize, Serialize};

/// Single-pass accumulator over an ordered sequence of trade profits.
///
/// Drawdowns are stored non-positive: a 500 dollar decline is `-500.0`.
///
/// Two percentage drawdowns are kept:
/// - `max_drawdown_pct`: `drawdown / peak * 100` against the running peak of
///   cumulative profit. Steps where that peak is not positive are skipped, so
///   it stays `None` until the ledger has been in profit.
/// - `max_drawdown_equity_pct`: the same decline against peak equity
///   (`initial_capital + peak`). `None` while capital is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitTracker {
    initial_capital: f64,
    cumulative: f64,
    peak: f64,
    trough: f64,
    gross_profit: f64,
    gross_loss: f64,
    max_drawdown: f64,
    max_drawdown_pct: Option<f64>,
    max_drawdown_equity_pct: Option<f64>,
    max_runup: f64,
    steps: usize,
}

impl ProfitTracker {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cumulative: 0.0,
            peak: 0.0,
            trough: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            max_drawdown: 0.0,
            max_drawdown_pct: None,
            max_drawdown_equity_pct: None,
            max_runup: 0.0,
            steps: 0,
        }
    }

    /// Add one trade's profit. Returns the drawdown at this step (<= 0).
    pub fn push(&mut self, net_profit: f64) -> f64 {
        self.steps += 1;
        self.cumulative += net_profit;
        if net_profit > 0.0 {
            self.gross_profit += net_profit;
        } else if net_profit < 0.0 {
            self.gross_loss += net_profit;
        }

        if self.cumulative > self.peak {
            self.peak = self.cumulative;
        }
        if self.cumulative < self.trough {
            self.trough = self.cumulative;
        }

        let drawdown = self.cumulative - self.peak;
        if drawdown < self.max_drawdown {
            self.max_drawdown = drawdown;
        }

        if self.peak > 0.0 {
            fold_worst(&mut self.max_drawdown_pct, drawdown / self.peak * 100.0);
        }
        if self.initial_capital > 0.0 {
            let peak_equity = self.initial_capital + self.peak;
            if peak_equity > 0.0 {
                fold_worst(
                    &mut self.max_drawdown_equity_pct,
                    drawdown / peak_equity * 100.0,
                );
            }
        }

        let runup = self.cumulative - self.trough;
        if runup > self.max_runup {
            self.max_runup = runup;
        }
        drawdown
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cumulative(&self) -> f64 {
        self.cumulative
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Current drawdown from the running peak (<= 0).
    pub fn drawdown(&self) -> f64 {
        self.cumulative - self.peak
    }

    pub fn gross_profit(&self) -> f64 {
        self.gross_profit
    }

    /// Sum of losing trades (<= 0).
    pub fn gross_loss(&self) -> f64 {
        self.gross_loss
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Worst drawdown as a percentage of the running profit peak.
    pub fn max_drawdown_pct(&self) -> Option<f64> {
        self.max_drawdown_pct
    }

    /// Worst drawdown as a percentage of peak equity.
    pub fn max_drawdown_equity_pct(&self) -> Option<f64> {
        self.max_drawdown_equity_pct
    }

    pub fn max_runup(&self) -> f64 {
        self.max_runup
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn profit_factor(&self) -> f64 {
        profit_factor(self.gross_profit, self.gross_loss)
    }

    pub fn recovery_factor(&self) -> f64 {
        recovery_factor(self.cumulative, self.max_drawdown)
    }
}

fn fold_worst(worst: &mut Option<f64>, pct: f64) {
    if worst.map_or(true, |w| pct < w) {
        *worst = Some(pct);
    }
}

/// `|gross_profit / gross_loss|`.
///
/// `+inf` when there are gains but no losses, `0.0` when there are neither.
pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    ratio_with_sentinel(gross_profit, gross_loss.abs())
}

/// `net_profit / |max_drawdown|`.
///
/// `+inf` for a positive net profit with no drawdown, `0.0` when both are zero.
pub fn recovery_factor(net_profit: f64, max_drawdown: f64) -> f64 {
    ratio_with_sentinel(net_profit, max_drawdown.abs())
}

fn ratio_with_sentinel(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator > 0.0 {
            f64::INFINITY
        } else if numerator < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        }
    } else {
        numerator / denominator
    }
}

// ─── Small statistics helpers ───────────────────────────────────────

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). `0.0` below two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
