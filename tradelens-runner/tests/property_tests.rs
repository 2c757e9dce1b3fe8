//! Property tests for leaderboard and enumeration invariants.
//!
//! Uses proptest to verify:
//! 1. Capacity invariant — the leaderboard never exceeds its capacity and
//!    stays sorted best first with unique member sets
//! 2. Combination count — enumeration yields exactly Σ C(n, k) subsets
//! 3. Monte Carlo — every shuffled path ends at the ledger's net profit

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tradelens_core::{compute_metrics, StrategyId, Trade, TradeLedger};
use tradelens_runner::{
    combination_count, simulate, Combinations, MonteCarloConfig, PortfolioCandidate,
    PortfolioLeaderboard, RankingKey,
};

fn candidate(members: &[u8], score: f64) -> PortfolioCandidate {
    let trades = TradeLedger::empty();
    let metrics = compute_metrics(&trades, 1_000.0).unwrap();
    PortfolioCandidate {
        members: members
            .iter()
            .map(|m| StrategyId::new(format!("S{m}")))
            .collect(),
        allocation: 1.0 / members.len().max(1) as f64,
        trades,
        metrics,
        score,
    }
}

fn arb_score() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => (-1_000.0..1_000.0_f64).prop_map(|s| s.round()),
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
    ]
}

fn arb_insert() -> impl Strategy<Value = (Vec<u8>, f64)> {
    (prop::collection::btree_set(0u8..8, 1..4), arb_score())
        .prop_map(|(members, score)| (members.into_iter().collect(), score))
}

fn arb_ledger() -> impl Strategy<Value = TradeLedger> {
    prop::collection::vec((0..200_i64, -500.0..500.0_f64), 1..25).prop_map(|rows| {
        let start = NaiveDate::from_ymd_opt(2021, 1, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let trades = rows
            .into_iter()
            .map(|(offset, profit)| Trade {
                entry_date: start,
                entry_price: 10.0,
                exit_date: start + Duration::days(offset),
                exit_price: 10.5,
                size: 1.0,
                net_profit: (profit * 100.0).round() / 100.0,
            })
            .collect();
        TradeLedger::new(trades).unwrap()
    })
}

proptest! {
    // ── 1. Capacity invariant ────────────────────────────────────────

    #[test]
    fn leaderboard_stays_bounded_sorted_and_unique(
        capacity in 0usize..12,
        inserts in prop::collection::vec(arb_insert(), 0..80),
    ) {
        let mut lb = PortfolioLeaderboard::new(capacity, RankingKey::NetProfit);
        for (members, score) in &inserts {
            lb.insert(candidate(members, *score));

            let entries = lb.entries();
            prop_assert!(entries.len() <= capacity);
            prop_assert!(entries.iter().all(|e| !e.score.is_nan()));
            prop_assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));

            let mut seen = HashSet::new();
            for e in entries {
                let mut key = e.members.clone();
                key.sort();
                prop_assert!(seen.insert(key));
            }
        }
    }

    #[test]
    fn leaderboard_keeps_the_best_distinct_scores(
        scores in prop::collection::vec(-1_000i32..1_000, 1..40),
        capacity in 1usize..10,
    ) {
        let mut lb = PortfolioLeaderboard::new(capacity, RankingKey::NetProfit);
        for (i, s) in scores.iter().enumerate() {
            lb.insert(candidate(&[i as u8], *s as f64));
        }
        let mut expected: Vec<f64> = scores.iter().map(|s| *s as f64).collect();
        expected.sort_by(|a, b| b.total_cmp(a));
        expected.truncate(capacity);
        let got: Vec<f64> = lb.entries().iter().map(|e| e.score).collect();
        prop_assert_eq!(got, expected);
    }

    // ── 2. Combination count ─────────────────────────────────────────

    #[test]
    fn enumeration_matches_binomial_sum(n in 1usize..10, a in 1usize..10, b in 1usize..10) {
        let (min, max) = (a.min(b), a.max(b));
        let produced = Combinations::new(n, min, max.min(n)).count() as u64;
        prop_assert_eq!(produced, combination_count(n, min, max));
    }

    // ── 3. Monte Carlo final mean ────────────────────────────────────

    #[test]
    fn shuffled_paths_end_at_net_profit(ledger in arb_ledger(), seed in any::<u64>()) {
        let config = MonteCarloConfig {
            iterations: 40,
            seed: Some(seed),
            sample_paths: 0,
            ..MonteCarloConfig::default()
        };
        let result = simulate(&ledger, &config).unwrap();
        let net = ledger.net_profit();
        prop_assert_eq!(result.points.len(), ledger.len() + 1);
        for path in &result.paths {
            prop_assert!((path.net_profit - net).abs() < 1e-6);
        }
        let last = result.final_point().unwrap();
        prop_assert!((last.mean - net).abs() < 1e-6);
        prop_assert!(result.points.iter().all(|p| p.lower_bound <= p.upper_bound));
    }
}
