//! Monte Carlo resampling of a trade ledger.
//!
//! Each run reorders the ledger's trade profits (a uniform Fisher–Yates
//! shuffle, or sampling with replacement in bootstrap mode) and walks the
//! resulting equity path. Runs are aggregated index by index: at trade
//! position `k` the cumulative profits of all runs are sorted and summarised
//! as a mean and an empirical-percentile interval.
//!
//! The interval at confidence `c` over `N` sorted runs is
//! `[sorted[floor((1 - c/100) * N)], sorted[ceil(c/100 * N)]]`, with indices
//! clipped to the array. It is an order-statistic band, not a parametric
//! confidence interval.
//!
//! Every run draws from its own RNG stream derived from the master seed, so
//! results are identical regardless of the rayon thread count.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tradelens_core::aggregate::recovery_factor;
use tradelens_core::{CoreError, ProfitTracker, RngHierarchy, TradeLedger};

/// Upper bound on simulated runs. Larger requests are clamped.
pub const MAX_ITERATIONS: usize = 10_000;

/// Confidence levels reported in the summary table.
pub const SUMMARY_CHECKPOINTS: [f64; 8] = [50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 99.0, 100.0];

const RNG_STREAM: &str = "monte-carlo";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingMethod {
    /// Random permutation of all trades.
    #[default]
    Shuffle,
    /// `N` trades drawn with replacement.
    Bootstrap,
}

impl std::str::FromStr for ResamplingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shuffle" => Ok(Self::Shuffle),
            "bootstrap" => Ok(Self::Bootstrap),
            other => Err(format!(
                "unknown resampling method '{other}'. Valid: shuffle, bootstrap"
            )),
        }
    }
}

/// Simulation parameters. Deserializable from the `[monte_carlo]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    /// Percent, in `[50, 100]`.
    pub confidence_level: f64,
    pub seed: Option<u64>,
    /// Capital used for rate-of-return and drawdown-percent figures.
    pub initial_capital: f64,
    pub method: ResamplingMethod,
    /// Runs whose drawdown paths are kept for plotting.
    pub sample_paths: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000,
            confidence_level: 95.0,
            seed: None,
            initial_capital: 100_000.0,
            method: ResamplingMethod::Shuffle,
            sample_paths: 10,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(50.0..=100.0).contains(&self.confidence_level) {
            return Err(CoreError::parameter(
                "confidence_level",
                format!("must be within [50, 100], got {}", self.confidence_level),
            ));
        }
        if !self.initial_capital.is_finite() || self.initial_capital < 0.0 {
            return Err(CoreError::InvalidCapital(self.initial_capital));
        }
        Ok(())
    }

    /// `iterations` clamped to [`MAX_ITERATIONS`].
    pub fn effective_iterations(&self) -> usize {
        self.iterations.min(MAX_ITERATIONS)
    }
}

/// Aggregate of all runs at one trade position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPoint {
    /// 0 is the flat starting point; `k` is after the k-th trade.
    pub trade_index: usize,
    pub mean: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Running drawdown (<= 0) of the first `sample_paths` runs.
    pub drawdown_sample: Vec<f64>,
}

/// End-of-path figures for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSummary {
    pub net_profit: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: Option<f64>,
    #[serde(with = "tradelens_core::float_sentinel")]
    pub profit_factor: f64,
}

/// One row of the summary table: the outcome reached or beaten by
/// `confidence` percent of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub confidence: f64,
    pub net_profit: f64,
    /// `net_profit / initial_capital * 100`; `None` at zero capital.
    pub rate_of_return: Option<f64>,
    pub max_drawdown: f64,
    pub max_drawdown_pct: Option<f64>,
    #[serde(with = "tradelens_core::float_sentinel")]
    pub return_drawdown_ratio: f64,
    #[serde(with = "tradelens_core::float_sentinel")]
    pub profit_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Runs actually simulated (after clamping).
    pub iterations: usize,
    pub confidence_level: f64,
    pub method: ResamplingMethod,
    pub seed: u64,
    /// Indices `0..=N`; empty for an empty ledger.
    pub points: Vec<SimulationPoint>,
    pub paths: Vec<PathSummary>,
    pub summary: Vec<SummaryRow>,
}

impl MonteCarloResult {
    fn empty(config: &MonteCarloConfig, iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            confidence_level: config.confidence_level,
            method: config.method,
            seed,
            points: Vec::new(),
            paths: Vec::new(),
            summary: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point after the last trade.
    pub fn final_point(&self) -> Option<&SimulationPoint> {
        self.points.last()
    }
}

struct SimulatedPath {
    cumulative: Vec<f64>,
    drawdown: Option<Vec<f64>>,
    summary: PathSummary,
}

/// Resample `ledger` and aggregate the equity paths.
///
/// An empty ledger or zero iterations gives an empty result. In shuffle mode
/// every run ends at the ledger's net profit, so the final mean equals it up
/// to floating-point rounding.
pub fn simulate(
    ledger: &TradeLedger,
    config: &MonteCarloConfig,
) -> Result<MonteCarloResult, CoreError> {
    config.validate()?;

    let iterations = config.effective_iterations();
    if iterations < config.iterations {
        warn!(
            requested = config.iterations,
            max = MAX_ITERATIONS,
            "monte carlo iterations clamped"
        );
    }

    let rngs = RngHierarchy::from_optional(config.seed);
    let seed = rngs.master_seed();
    if ledger.is_empty() || iterations == 0 {
        debug!(trades = ledger.len(), iterations, "nothing to simulate");
        return Ok(MonteCarloResult::empty(config, iterations, seed));
    }

    info!(
        trades = ledger.len(),
        iterations,
        method = ?config.method,
        confidence = config.confidence_level,
        seed,
        "starting monte carlo simulation"
    );

    let profits: Vec<f64> = ledger.iter().map(|t| t.net_profit).collect();
    let capital = config.initial_capital;
    let sample_paths = config.sample_paths;
    let method = config.method;

    let runs: Vec<SimulatedPath> = (0..iterations)
        .into_par_iter()
        .map(|run| {
            let mut rng = rngs.rng_for(RNG_STREAM, run as u64);
            let sequence = resample(&profits, method, &mut rng);
            walk(&sequence, capital, run < sample_paths)
        })
        .collect();

    let points = aggregate_points(&runs, profits.len(), config.confidence_level);
    let paths: Vec<PathSummary> = runs.into_iter().map(|r| r.summary).collect();
    let summary = summary_table(&paths, capital);

    Ok(MonteCarloResult {
        iterations,
        confidence_level: config.confidence_level,
        method,
        seed,
        points,
        paths,
        summary,
    })
}

fn resample(profits: &[f64], method: ResamplingMethod, rng: &mut StdRng) -> Vec<f64> {
    match method {
        ResamplingMethod::Shuffle => {
            let mut sequence = profits.to_vec();
            sequence.shuffle(rng);
            sequence
        }
        ResamplingMethod::Bootstrap => (0..profits.len())
            .map(|_| profits[rng.gen_range(0..profits.len())])
            .collect(),
    }
}

fn walk(sequence: &[f64], capital: f64, keep_drawdown: bool) -> SimulatedPath {
    let mut tracker = ProfitTracker::new(capital);
    let mut cumulative = Vec::with_capacity(sequence.len() + 1);
    cumulative.push(0.0);
    let mut drawdown = keep_drawdown.then(|| {
        let mut d = Vec::with_capacity(sequence.len() + 1);
        d.push(0.0);
        d
    });

    for &profit in sequence {
        let dd = tracker.push(profit);
        cumulative.push(tracker.cumulative());
        if let Some(d) = drawdown.as_mut() {
            d.push(dd);
        }
    }

    SimulatedPath {
        cumulative,
        drawdown,
        summary: PathSummary {
            net_profit: tracker.cumulative(),
            max_drawdown: tracker.max_drawdown(),
            max_drawdown_pct: tracker.max_drawdown_pct(),
            profit_factor: tracker.profit_factor(),
        },
    }
}

fn aggregate_points(runs: &[SimulatedPath], trades: usize, confidence: f64) -> Vec<SimulationPoint> {
    let mut column = Vec::with_capacity(runs.len());
    (0..=trades)
        .filter_map(|k| {
            column.clear();
            column.extend(runs.iter().map(|r| r.cumulative[k]));
            column.sort_by(f64::total_cmp);
            let (lower, upper) = interval_indices(column.len(), confidence)?;
            Some(SimulationPoint {
                trade_index: k,
                mean: column.iter().sum::<f64>() / column.len() as f64,
                lower_bound: column[lower],
                upper_bound: column[upper],
                drawdown_sample: runs
                    .iter()
                    .filter_map(|r| r.drawdown.as_ref().map(|d| d[k]))
                    .collect(),
            })
        })
        .collect()
}

/// Order-statistic indices `(floor((1 - c/100) * n), ceil(c/100 * n))`
/// clipped to `n - 1`, or `None` for an empty sample.
pub fn interval_indices(n: usize, confidence: f64) -> Option<(usize, usize)> {
    let last = n.checked_sub(1)?;
    let c = confidence / 100.0;
    let lower = ((1.0 - c) * n as f64).floor() as usize;
    let upper = (c * n as f64).ceil() as usize;
    Some((lower.min(last), upper.min(last)))
}

/// Value reached or beaten by `confidence` percent of the sorted samples.
fn conservative_quantile(sorted: &[f64], confidence: f64) -> Option<f64> {
    let (lower, _) = interval_indices(sorted.len(), confidence)?;
    sorted.get(lower).copied()
}

fn sorted_values(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Summary at each of [`SUMMARY_CHECKPOINTS`].
///
/// Each column is ranked independently, worst first, and read at the
/// conservative side of the interval: 100% is the worst run, 50% the median.
pub fn summary_table(paths: &[PathSummary], initial_capital: f64) -> Vec<SummaryRow> {
    if paths.is_empty() {
        return Vec::new();
    }
    let net = sorted_values(paths.iter().map(|p| p.net_profit));
    let dd = sorted_values(paths.iter().map(|p| p.max_drawdown));
    let dd_pct = sorted_values(paths.iter().filter_map(|p| p.max_drawdown_pct));
    let pf = sorted_values(paths.iter().map(|p| p.profit_factor));

    SUMMARY_CHECKPOINTS
        .iter()
        .map(|&confidence| {
            let net_profit = conservative_quantile(&net, confidence).unwrap_or(0.0);
            let max_drawdown = conservative_quantile(&dd, confidence).unwrap_or(0.0);
            SummaryRow {
                confidence,
                net_profit,
                rate_of_return: (initial_capital > 0.0)
                    .then(|| net_profit / initial_capital * 100.0),
                max_drawdown,
                max_drawdown_pct: conservative_quantile(&dd_pct, confidence),
                return_drawdown_ratio: recovery_factor(net_profit, max_drawdown),
                profit_factor: conservative_quantile(&pf, confidence).unwrap_or(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn interval_indices_follow_order_statistics() {
        assert_eq!(interval_indices(100, 95.0), Some((5, 95)));
        assert_eq!(interval_indices(100, 100.0), Some((0, 99)));
        assert_eq!(interval_indices(10, 50.0), Some((5, 5)));
        assert_eq!(interval_indices(1, 90.0), Some((0, 0)));
    }

    #[test]
    fn empty_sample_has_no_interval() {
        assert_eq!(interval_indices(0, 95.0), None);
        assert_eq!(interval_indices(0, 100.0), None);
        assert!(summary_table(&[], 10_000.0).is_empty());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(3);
        let profits = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut out = resample(&profits, ResamplingMethod::Shuffle, &mut rng);
        out.sort_by(f64::total_cmp);
        assert_eq!(out, profits);
    }

    #[test]
    fn bootstrap_draws_from_ledger_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let profits = [-2.0, 7.0];
        let out = resample(&profits, ResamplingMethod::Bootstrap, &mut rng);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| profits.contains(p)));
    }

    #[test]
    fn walk_tracks_drawdown_path() {
        let path = walk(&[100.0, -30.0, -20.0, 60.0], 1_000.0, true);
        assert_eq!(path.cumulative, vec![0.0, 100.0, 70.0, 50.0, 110.0]);
        assert_eq!(path.drawdown, Some(vec![0.0, 0.0, -30.0, -50.0, 0.0]));
        assert_eq!(path.summary.max_drawdown, -50.0);
        assert_eq!(path.summary.net_profit, 110.0);
        assert!((path.summary.profit_factor - 3.2).abs() < 1e-12);
    }

    #[test]
    fn summary_rows_are_ordered_by_conservatism() {
        let paths: Vec<PathSummary> = (1..=10)
            .map(|i| PathSummary {
                net_profit: i as f64 * 100.0,
                max_drawdown: -(i as f64) * 10.0,
                max_drawdown_pct: Some(-(i as f64)),
                profit_factor: 1.0 + i as f64 / 10.0,
            })
            .collect();
        let rows = summary_table(&paths, 10_000.0);
        assert_eq!(rows.len(), SUMMARY_CHECKPOINTS.len());

        let worst = rows.last().unwrap();
        assert_eq!(worst.confidence, 100.0);
        assert_eq!(worst.net_profit, 100.0);
        assert_eq!(worst.max_drawdown, -100.0);
        assert_eq!(worst.rate_of_return, Some(1.0));
        assert_eq!(worst.return_drawdown_ratio, 1.0);

        let median = &rows[0];
        assert_eq!(median.net_profit, 600.0);
        assert!(rows.windows(2).all(|w| w[0].net_profit >= w[1].net_profit));
    }

    #[test]
    fn config_rejects_out_of_range_confidence() {
        for bad in [49.9, 100.5, f64::NAN] {
            let config = MonteCarloConfig {
                confidence_level: bad,
                ..MonteCarloConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn method_parses() {
        assert_eq!("Bootstrap".parse::<ResamplingMethod>(), Ok(ResamplingMethod::Bootstrap));
        assert!("jackknife".parse::<ResamplingMethod>().is_err());
    }
}
