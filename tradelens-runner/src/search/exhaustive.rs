//! Exhaustive mode — score every subset in the size range.

use tracing::{info, warn};

use tradelens_core::StrategyLedger;

use super::{SearchDriver, SearchError, SearchHooks, SearchOutcome, BATCH_SIZE};
use crate::combinations::{combination_count, Combinations};
use crate::search::SearchConfig;

/// Enumerate all subsets of `strategies` with a size in
/// `[min_strategies, max_strategies]`, merge each with equal weight and keep
/// the best `max_stored_portfolios` by `ranking_function`.
///
/// Subsets are visited in lexicographic order, smallest size first. Scoring
/// stops after `max_combinations` subsets (`truncated = true`) or when the
/// cancel flag is raised between batches; the leaderboard stays sorted and
/// within capacity either way.
pub fn exhaustive_search(
    strategies: &[StrategyLedger],
    config: &SearchConfig,
    hooks: SearchHooks<'_>,
) -> Result<SearchOutcome, SearchError> {
    let Some((mut driver, min_size, max_size)) = SearchDriver::start(strategies, config, hooks)?
    else {
        return Ok(SearchOutcome::empty());
    };

    let n = driver.strategies().len();
    let planned = combination_count(n, min_size, max_size);
    let truncated = planned > config.max_combinations;
    let limit = planned.min(config.max_combinations);
    if truncated {
        warn!(
            planned,
            limit = config.max_combinations,
            "combination count exceeds max_combinations, enumeration will be truncated"
        );
    }
    info!(
        strategies = n,
        min_size,
        max_size,
        planned,
        ranking = %config.ranking_function,
        "starting exhaustive search"
    );

    let limit_usize = usize::try_from(limit).unwrap_or(usize::MAX);
    let mut subsets = Combinations::new(n, min_size, max_size).take(limit_usize);
    let mut processed: u64 = 0;
    let mut cancelled = false;

    loop {
        if driver.is_cancelled() {
            cancelled = true;
            break;
        }
        let batch: Vec<Vec<usize>> = subsets.by_ref().take(BATCH_SIZE).collect();
        if batch.is_empty() {
            break;
        }
        processed += batch.len() as u64;

        let scored = driver.evaluate_batch(&batch)?;
        driver.record(scored);
        driver.report(processed, limit);
    }

    Ok(driver.finish(planned, cancelled, truncated, None, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankingKey;
    use chrono::{NaiveDate, NaiveDateTime};
    use tradelens_core::{Trade, TradeLedger};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn strategy(id: &str, profit: f64) -> StrategyLedger {
        let trade = Trade {
            entry_date: day(1),
            entry_price: 10.0,
            exit_date: day(2),
            exit_price: 11.0,
            size: 10.0,
            net_profit: profit,
        };
        StrategyLedger::new(id, TradeLedger::new(vec![trade]).unwrap())
    }

    fn config(min: usize, max: usize, capacity: usize) -> SearchConfig {
        SearchConfig {
            min_strategies: min,
            max_strategies: max,
            max_stored_portfolios: capacity,
            ranking_function: RankingKey::NetProfit,
            total_capital: 10_000.0,
            threads: 1,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn scores_every_subset_in_range() {
        let strategies: Vec<_> = (0..5).map(|i| strategy(&format!("S{i}"), i as f64)).collect();
        let out = exhaustive_search(&strategies, &config(2, 3, 100), SearchHooks::default()).unwrap();
        assert_eq!(out.planned, 20);
        assert_eq!(out.evaluated, 20);
        assert_eq!(out.candidates.len(), 20);
        assert!(!out.truncated && !out.cancelled);
    }

    #[test]
    fn best_pair_wins() {
        let strategies = vec![strategy("A", 10.0), strategy("B", 50.0), strategy("C", 30.0)];
        let out = exhaustive_search(&strategies, &config(2, 2, 1), SearchHooks::default()).unwrap();
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].name(), "B + C");
        assert!((out.candidates[0].score - 40.0).abs() < 1e-12);
    }

    #[test]
    fn empty_results_for_unviable_bounds() {
        let strategies = vec![strategy("A", 1.0), strategy("B", 2.0)];
        assert!(exhaustive_search(&[], &config(1, 2, 10), SearchHooks::default())
            .unwrap()
            .candidates
            .is_empty());
        assert!(exhaustive_search(&strategies, &config(2, 1, 10), SearchHooks::default())
            .unwrap()
            .candidates
            .is_empty());
        assert!(exhaustive_search(&strategies, &config(3, 4, 10), SearchHooks::default())
            .unwrap()
            .candidates
            .is_empty());
    }

    #[test]
    fn negative_capital_is_an_error() {
        let strategies = vec![strategy("A", 1.0)];
        let mut cfg = config(1, 1, 10);
        cfg.total_capital = -5.0;
        assert!(exhaustive_search(&strategies, &cfg, SearchHooks::default()).is_err());
    }

    #[test]
    fn max_combinations_truncates() {
        let strategies: Vec<_> = (0..6).map(|i| strategy(&format!("S{i}"), 1.0)).collect();
        let mut cfg = config(1, 6, 100);
        cfg.max_combinations = 10;
        let out = exhaustive_search(&strategies, &cfg, SearchHooks::default()).unwrap();
        assert!(out.truncated);
        assert_eq!(out.evaluated, 10);
        assert_eq!(out.planned, 63);
    }
}
