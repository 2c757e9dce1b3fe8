//! Portfolio combination search.
//!
//! Two interchangeable strategies find the best equal-weight portfolios
//! among a set of strategy ledgers:
//! - [`exhaustive_search`] scores every subset with a size in
//!   `[min_strategies, max_strategies]`.
//! - [`genetic_search`] evolves a population of subsets for a fixed number
//!   of generations.
//!
//! Both score candidates in parallel batches (rayon) and merge them into a
//! single [`PortfolioLeaderboard`] on the calling thread, in evaluation
//! order, so ties resolve the same way regardless of thread count.

pub mod exhaustive;
pub mod genetic;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use tradelens_core::{CoreError, StrategyId, StrategyLedger};

use crate::checkpoint::Checkpointer;
use crate::leaderboard::{InsertResult, PortfolioLeaderboard};
use crate::portfolio::{evaluate_portfolio, PortfolioCandidate};
use crate::ranking::RankingKey;

pub use exhaustive::exhaustive_search;
pub use genetic::{genetic_search, GenerationStats};

/// Candidates scored per parallel batch in exhaustive mode.
pub const BATCH_SIZE: usize = 256;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    #[default]
    #[serde(alias = "exhaustive")]
    Bruteforce,
    Genetic,
}

impl std::str::FromStr for SearchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bruteforce" | "exhaustive" => Ok(Self::Bruteforce),
            "genetic" | "ga" => Ok(Self::Genetic),
            other => Err(format!(
                "unknown search method '{other}'. Valid: bruteforce, genetic"
            )),
        }
    }
}

/// Search parameters. Deserializable from the `[portfolio]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub min_strategies: usize,
    pub max_strategies: usize,
    pub ranking_function: RankingKey,
    pub search_method: SearchMethod,
    pub population_size: usize,
    pub generations: usize,
    /// Leaderboard capacity.
    pub max_stored_portfolios: usize,
    pub total_capital: f64,
    /// Master seed for genetic mode. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Worker threads: 0 uses the global rayon pool, 1 runs sequentially.
    pub threads: usize,
    /// Evaluations between checkpoint saves (0 saves only at the end).
    pub checkpoint_interval: usize,
    /// Hard cap on candidates scored by exhaustive mode.
    pub max_combinations: u64,
    /// Chromosomes copied unchanged into the next generation.
    pub elite_count: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_strategies: 2,
            max_strategies: 4,
            ranking_function: RankingKey::NetProfit,
            search_method: SearchMethod::Bruteforce,
            population_size: 50,
            generations: 30,
            max_stored_portfolios: 25,
            total_capital: 100_000.0,
            seed: None,
            threads: 0,
            checkpoint_interval: 500,
            max_combinations: 1_000_000,
            elite_count: 1,
        }
    }
}

// ─── Hooks, progress & outcome ───────────────────────────────────────

/// Caller-side hooks. All are optional and invoked on the calling thread.
#[derive(Clone, Copy, Default)]
pub struct SearchHooks<'a> {
    pub progress: Option<&'a dyn Fn(&SearchProgress)>,
    pub cancel: Option<&'a AtomicBool>,
    pub checkpointer: Option<&'a dyn Checkpointer>,
}

impl std::fmt::Debug for SearchHooks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHooks")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .field("checkpointer", &self.checkpointer.is_some())
            .finish()
    }
}

/// Progress update sent during a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Exhaustive: candidates scored. Genetic: generations completed.
    pub processed: u64,
    pub total: u64,
    pub evaluated: usize,
    pub best_score: Option<f64>,
    pub leaderboard_entries: usize,
    pub elapsed_secs: f64,
}

/// Final result of a search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best portfolios, best first, at most `max_stored_portfolios`.
    pub candidates: Vec<PortfolioCandidate>,
    /// Distinct member sets scored in this run.
    pub evaluated: usize,
    /// Exhaustive: subsets in range. Genetic: upper bound on evaluations.
    pub planned: u64,
    pub cancelled: bool,
    /// Exhaustive enumeration stopped at `max_combinations`.
    pub truncated: bool,
    pub elapsed_secs: f64,
    /// Seed used by genetic mode.
    pub seed: Option<u64>,
    /// Per-generation fitness summary (genetic mode only).
    pub history: Vec<GenerationStats>,
}

impl SearchOutcome {
    fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            evaluated: 0,
            planned: 0,
            cancelled: false,
            truncated: false,
            elapsed_secs: 0.0,
            seed: None,
            history: Vec::new(),
        }
    }

    pub fn best(&self) -> Option<&PortfolioCandidate> {
        self.candidates.first()
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Run the search method selected in `config`.
pub fn run_search(
    strategies: &[StrategyLedger],
    config: &SearchConfig,
    hooks: SearchHooks<'_>,
) -> Result<SearchOutcome, SearchError> {
    match config.search_method {
        SearchMethod::Bruteforce => exhaustive_search(strategies, config, hooks),
        SearchMethod::Genetic => genetic_search(strategies, config, hooks),
    }
}

// ─── Shared search driver ────────────────────────────────────────────

/// Effective `[min, max]` subset sizes, or `None` when no portfolio is viable.
///
/// A zero minimum is raised to 1 and the maximum is clipped to the number of
/// strategies. An empty universe, `min > max` or `min > n` yields `None`.
pub(crate) fn subset_bounds(n: usize, min_size: usize, max_size: usize) -> Option<(usize, usize)> {
    let min_size = min_size.max(1);
    let max_size = max_size.min(n);
    if n == 0 || min_size > max_size {
        None
    } else {
        Some((min_size, max_size))
    }
}

fn validate_capital(total_capital: f64) -> Result<(), CoreError> {
    if !total_capital.is_finite() || total_capital < 0.0 {
        return Err(CoreError::InvalidCapital(total_capital));
    }
    Ok(())
}

/// State shared by both search methods: leaderboard, pool, hooks, checkpoints.
pub(crate) struct SearchDriver<'a> {
    strategies: &'a [StrategyLedger],
    config: &'a SearchConfig,
    hooks: SearchHooks<'a>,
    pool: Option<rayon::ThreadPool>,
    leaderboard: PortfolioLeaderboard,
    start: Instant,
    evaluated: usize,
    since_checkpoint: usize,
}

impl<'a> SearchDriver<'a> {
    /// Validate inputs, build the worker pool and resume from a checkpoint.
    ///
    /// Returns `Ok(None)` when the bounds leave no viable portfolio.
    pub(crate) fn start(
        strategies: &'a [StrategyLedger],
        config: &'a SearchConfig,
        hooks: SearchHooks<'a>,
    ) -> Result<Option<(Self, usize, usize)>, SearchError> {
        validate_capital(config.total_capital)?;
        let Some((min_size, max_size)) = subset_bounds(
            strategies.len(),
            config.min_strategies,
            config.max_strategies,
        ) else {
            debug!(
                strategies = strategies.len(),
                min = config.min_strategies,
                max = config.max_strategies,
                "no viable portfolio size, returning empty result"
            );
            return Ok(None);
        };

        let pool = if config.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .build()
                    .map_err(|e| SearchError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };

        let mut driver = Self {
            strategies,
            config,
            hooks,
            pool,
            leaderboard: PortfolioLeaderboard::new(
                config.max_stored_portfolios,
                config.ranking_function,
            ),
            start: Instant::now(),
            evaluated: 0,
            since_checkpoint: 0,
        };
        driver.resume(min_size, max_size);
        Ok(Some((driver, min_size, max_size)))
    }

    /// Seed the leaderboard from the checkpointer's last snapshot.
    ///
    /// Only the member sets are taken from the snapshot: each one is merged
    /// and scored again against the current ledgers, capital and ranking key.
    /// Sets naming unknown strategies or outside the size bounds are dropped.
    /// Load or scoring failures are logged and the search starts fresh.
    fn resume(&mut self, min_size: usize, max_size: usize) {
        let Some(checkpointer) = self.hooks.checkpointer else {
            return;
        };
        let snapshot = match checkpointer.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "failed to load checkpoint, starting fresh");
                return;
            }
        };

        let index_of: HashMap<&StrategyId, usize> = self
            .strategies
            .iter()
            .enumerate()
            .map(|(i, s)| (&s.id, i))
            .collect();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut subsets: Vec<Vec<usize>> = Vec::with_capacity(snapshot.len());
        for candidate in &snapshot {
            let size = candidate.size();
            if size < min_size || size > max_size {
                continue;
            }
            let Some(mut indices) = candidate
                .members
                .iter()
                .map(|m| index_of.get(m).copied())
                .collect::<Option<Vec<usize>>>()
            else {
                continue;
            };
            indices.sort_unstable();
            indices.dedup();
            if indices.len() == size && seen.insert(indices.clone()) {
                subsets.push(indices);
            }
        }

        let rescored = match self.evaluate_batch(&subsets) {
            Ok(rescored) => rescored,
            Err(e) => {
                warn!(error = %e, "failed to rescore checkpoint, starting fresh");
                return;
            }
        };
        let mut restored = 0usize;
        for candidate in rescored {
            if self.leaderboard.insert(candidate) != InsertResult::Skipped {
                restored += 1;
            }
        }
        info!(
            restored,
            snapshot = snapshot.len(),
            "resumed leaderboard from checkpoint"
        );
    }

    pub(crate) fn strategies(&self) -> &'a [StrategyLedger] {
        self.strategies
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.hooks
            .cancel
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub(crate) fn leaderboard(&self) -> &PortfolioLeaderboard {
        &self.leaderboard
    }

    /// Score a batch of index subsets, in parallel unless `threads == 1`.
    ///
    /// Output order matches `batch`.
    pub(crate) fn evaluate_batch(
        &self,
        batch: &[Vec<usize>],
    ) -> Result<Vec<PortfolioCandidate>, CoreError> {
        let strategies = self.strategies;
        let capital = self.config.total_capital;
        let key = self.config.ranking_function;
        let score = |indices: &Vec<usize>| evaluate_portfolio(strategies, indices, capital, key);

        if self.config.threads == 1 {
            return batch.iter().map(score).collect();
        }
        match &self.pool {
            Some(pool) => pool.install(|| batch.par_iter().map(score).collect()),
            None => batch.par_iter().map(score).collect(),
        }
    }

    /// Merge scored candidates into the leaderboard in order.
    pub(crate) fn record(&mut self, candidates: Vec<PortfolioCandidate>) {
        let n = candidates.len();
        for candidate in candidates {
            self.leaderboard.insert(candidate);
        }
        self.evaluated += n;
        self.since_checkpoint += n;

        let interval = self.config.checkpoint_interval;
        if interval > 0 && self.since_checkpoint >= interval {
            self.save_checkpoint();
        }
    }

    pub(crate) fn report(&self, processed: u64, total: u64) {
        let Some(cb) = self.hooks.progress else {
            return;
        };
        cb(&SearchProgress {
            processed,
            total,
            evaluated: self.evaluated,
            best_score: self.leaderboard.best().map(|c| c.score),
            leaderboard_entries: self.leaderboard.len(),
            elapsed_secs: self.start.elapsed().as_secs_f64(),
        });
    }

    fn save_checkpoint(&mut self) {
        self.since_checkpoint = 0;
        let Some(checkpointer) = self.hooks.checkpointer else {
            return;
        };
        match checkpointer.save(self.leaderboard.entries()) {
            Ok(()) => debug!(
                entries = self.leaderboard.len(),
                evaluated = self.evaluated,
                "checkpoint saved"
            ),
            Err(e) => warn!(error = %e, "failed to save checkpoint"),
        }
    }

    /// Final checkpoint and outcome assembly.
    pub(crate) fn finish(
        mut self,
        planned: u64,
        cancelled: bool,
        truncated: bool,
        seed: Option<u64>,
        history: Vec<GenerationStats>,
    ) -> SearchOutcome {
        self.save_checkpoint();
        let elapsed_secs = self.start.elapsed().as_secs_f64();
        info!(
            evaluated = self.evaluated,
            planned,
            stored = self.leaderboard.len(),
            cancelled,
            truncated,
            elapsed_secs,
            "search finished"
        );
        SearchOutcome {
            candidates: self.leaderboard.into_entries(),
            evaluated: self.evaluated,
            planned,
            cancelled,
            truncated,
            elapsed_secs,
            seed,
            history,
        }
    }
}
