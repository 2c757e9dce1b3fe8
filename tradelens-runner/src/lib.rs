//! TradeLens Runner — portfolio search, Monte Carlo resampling, config and export.
//!
//! This crate builds on `tradelens-core` to provide:
//! - Trade sources (in-memory and JSON directory)
//! - Ranking keys and a bounded, deduplicated portfolio leaderboard
//! - Exhaustive and genetic combination search with checkpoints,
//!   progress callbacks and cooperative cancellation
//! - Monte Carlo trade resampling with confidence bands and summary tables
//! - TOML analysis config and JSON/CSV/text export

pub mod checkpoint;
pub mod combinations;
pub mod config;
pub mod export;
pub mod leaderboard;
pub mod monte_carlo;
pub mod portfolio;
pub mod ranking;
pub mod search;
pub mod source;

pub use checkpoint::{CheckpointError, Checkpointer, JsonFileCheckpointer, MemoryCheckpointer};
pub use combinations::{combination_count, Combinations};
pub use config::{AnalysisConfig, ConfigError};
pub use leaderboard::{InsertResult, PortfolioLeaderboard};
pub use monte_carlo::{
    simulate, MonteCarloConfig, MonteCarloResult, PathSummary, ResamplingMethod,
    SimulationPoint, SummaryRow, MAX_ITERATIONS,
};
pub use portfolio::{evaluate_portfolio, PortfolioCandidate};
pub use ranking::RankingKey;
pub use search::{
    exhaustive_search, genetic_search, run_search, GenerationStats, SearchConfig, SearchError,
    SearchHooks, SearchMethod, SearchOutcome, SearchProgress,
};
pub use source::{InMemorySource, JsonDirectorySource, SourceError, TradeSource};
