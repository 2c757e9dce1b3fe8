//! Trade — one closed position as supplied by the import layer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A closed round-trip trade.
///
/// `net_profit` is an independent input: commissions and slippage may already
/// be netted in, so it is never re-derived from prices and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_date: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_date: NaiveDateTime,
    pub exit_price: f64,

    // ── Size & PnL ──
    pub size: f64,
    pub net_profit: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_profit > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.net_profit < 0.0
    }

    pub fn is_even(&self) -> bool {
        self.net_profit == 0.0
    }

    /// Holding period in fractional days.
    pub fn holding_days(&self) -> f64 {
        (self.exit_date - self.entry_date).num_seconds() as f64 / 86_400.0
    }

    /// Copy with `size` and `net_profit` scaled by `weight`.
    pub fn scaled(&self, weight: f64) -> Self {
        Self {
            size: self.size * weight,
            net_profit: self.net_profit * weight,
            ..self.clone()
        }
    }

    /// Check the shape invariants of a single trade.
    pub fn validate(&self) -> Result<(), String> {
        if !self.net_profit.is_finite() {
            return Err(format!("net_profit is not finite ({})", self.net_profit));
        }
        if !self.size.is_finite() {
            return Err(format!("size is not finite ({})", self.size));
        }
        if !(self.entry_price.is_finite() && self.entry_price > 0.0) {
            return Err(format!("entry_price must be positive ({})", self.entry_price));
        }
        if !(self.exit_price.is_finite() && self.exit_price > 0.0) {
            return Err(format!("exit_price must be positive ({})", self.exit_price));
        }
        if self.exit_date < self.entry_date {
            return Err(format!(
                "exit_date {} precedes entry_date {}",
                self.exit_date, self.entry_date
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
    }

    fn sample_trade() -> Trade {
        Trade {
            entry_date: at(4),
            entry_price: 100.0,
            exit_date: at(8),
            exit_price: 110.0,
            size: 50.0,
            net_profit: 485.0,
        }
    }

    #[test]
    fn classification() {
        let t = sample_trade();
        assert!(t.is_winner());
        assert!(!t.is_loser());
        assert!(!t.is_even());

        let even = Trade {
            net_profit: 0.0,
            ..sample_trade()
        };
        assert!(even.is_even());
        assert!(!even.is_winner());
    }

    #[test]
    fn scaled_touches_size_and_profit_only() {
        let t = sample_trade().scaled(0.5);
        assert_eq!(t.size, 25.0);
        assert_eq!(t.net_profit, 242.5);
        assert_eq!(t.entry_price, 100.0);
        assert_eq!(t.exit_date, at(8));
    }

    #[test]
    fn holding_days_counts_fractional_days() {
        assert!((sample_trade().holding_days() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_exit_before_entry() {
        let t = Trade {
            exit_date: at(1),
            ..sample_trade()
        };
        assert!(t.validate().unwrap_err().contains("precedes"));
    }

    #[test]
    fn validate_rejects_non_positive_price() {
        let t = Trade {
            entry_price: 0.0,
            ..sample_trade()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn validate_rejects_nan_profit() {
        let t = Trade {
            net_profit: f64::NAN,
            ..sample_trade()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let deser: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
