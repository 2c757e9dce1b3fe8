//! TradeLens CLI — metrics, portfolio search and Monte Carlo commands.
//!
//! Commands:
//! - `metrics` — compute the performance report of one trade ledger
//! - `search` — rank strategy combinations from a directory of ledgers
//! - `monte-carlo` — resample a ledger and print confidence bands and summary
//! - `config` — print the default analysis config as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tradelens_core::compute_metrics;
use tradelens_runner::export::{
    export_bands_csv, export_candidates_csv, export_metrics_json, export_monte_carlo_json,
    export_summary_csv, generate_report, write_artifact,
};
use tradelens_runner::source::read_ledger_file;
use tradelens_runner::{
    run_search, simulate, AnalysisConfig, JsonDirectorySource, JsonFileCheckpointer,
    MonteCarloResult, RankingKey, ResamplingMethod, SearchHooks, SearchMethod, SearchOutcome,
    SearchProgress, TradeSource,
};

#[derive(Parser)]
#[command(
    name = "tradelens",
    about = "TradeLens CLI — trade ledger metrics, portfolio search and Monte Carlo analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute performance metrics for a single trade ledger.
    Metrics {
        /// Ledger file (JSON array of trades).
        #[arg(long)]
        trades: PathBuf,

        /// Initial capital used for percentage metrics.
        #[arg(long, default_value_t = 100_000.0)]
        capital: f64,

        /// Print the report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Search strategy combinations and print the best portfolios.
    Search {
        /// Directory with one `<strategy>.json` ledger per strategy.
        #[arg(long)]
        strategies: PathBuf,

        /// Path to a TOML analysis config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Search method: bruteforce or genetic.
        #[arg(long)]
        method: Option<SearchMethod>,

        /// Smallest portfolio size.
        #[arg(long)]
        min: Option<usize>,

        /// Largest portfolio size.
        #[arg(long)]
        max: Option<usize>,

        /// Ranking key, e.g. net_profit, sharpe_ratio, profit_factor.
        #[arg(long)]
        rank: Option<RankingKey>,

        /// Seed for the genetic search.
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads (0 = rayon default, 1 = sequential).
        #[arg(long)]
        threads: Option<usize>,

        /// Checkpoint file; an existing snapshot is resumed.
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Write the ranked portfolios as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Resample a trade ledger and report confidence bands.
    MonteCarlo {
        /// Ledger file (JSON array of trades).
        #[arg(long)]
        trades: PathBuf,

        /// Path to a TOML analysis config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of resampled runs.
        #[arg(long)]
        iterations: Option<usize>,

        /// Confidence level in percent (50..=100).
        #[arg(long)]
        confidence: Option<f64>,

        /// Seed for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,

        /// Resampling method: shuffle or bootstrap.
        #[arg(long)]
        method: Option<ResamplingMethod>,

        /// Output directory for summary.csv, bands.csv and result.json.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the default analysis config as TOML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Metrics {
            trades,
            capital,
            json,
        } => run_metrics(&trades, capital, json),
        Commands::Search {
            strategies,
            config,
            method,
            min,
            max,
            rank,
            seed,
            threads,
            checkpoint,
            output,
        } => {
            let mut analysis = load_config(config.as_deref())?;
            let search = &mut analysis.portfolio;
            if let Some(method) = method {
                search.search_method = method;
            }
            if let Some(min) = min {
                search.min_strategies = min;
            }
            if let Some(max) = max {
                search.max_strategies = max;
            }
            if let Some(rank) = rank {
                search.ranking_function = rank;
            }
            if seed.is_some() {
                search.seed = seed;
            }
            if let Some(threads) = threads {
                search.threads = threads;
            }
            analysis.validate()?;
            run_search_cmd(&strategies, &analysis, checkpoint, output)
        }
        Commands::MonteCarlo {
            trades,
            config,
            iterations,
            confidence,
            seed,
            method,
            output_dir,
        } => {
            let mut analysis = load_config(config.as_deref())?;
            let mc = &mut analysis.monte_carlo;
            if let Some(iterations) = iterations {
                mc.iterations = iterations;
            }
            if let Some(confidence) = confidence {
                mc.confidence_level = confidence;
            }
            if seed.is_some() {
                mc.seed = seed;
            }
            if let Some(method) = method {
                mc.method = method;
            }
            analysis.validate()?;
            run_monte_carlo_cmd(&trades, &analysis, output_dir)
        }
        Commands::Config => {
            print!("{}", AnalysisConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn run_metrics(trades: &Path, capital: f64, json: bool) -> Result<()> {
    let ledger = read_ledger_file(trades)?;
    let report = compute_metrics(&ledger, capital)?;
    if json {
        println!("{}", export_metrics_json(&report)?);
    } else {
        print!("{}", generate_report(&report));
    }
    Ok(())
}

fn run_search_cmd(
    dir: &Path,
    analysis: &AnalysisConfig,
    checkpoint: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let source = JsonDirectorySource::new(dir);
    let strategies = source.load_all()?;
    if strategies.is_empty() {
        bail!("no strategy ledgers found in {}", dir.display());
    }
    info!(
        strategies = strategies.len(),
        method = ?analysis.portfolio.search_method,
        "starting portfolio search"
    );

    let checkpointer = checkpoint.map(JsonFileCheckpointer::new);
    let last_decile = Cell::new(0u64);
    let progress = |p: &SearchProgress| {
        if p.total == 0 {
            return;
        }
        let decile = p.processed * 10 / p.total;
        if decile > last_decile.get() {
            last_decile.set(decile);
            info!(
                processed = p.processed,
                total = p.total,
                best = ?p.best_score,
                "search progress"
            );
        }
    };
    let hooks = SearchHooks {
        progress: Some(&progress),
        cancel: None,
        checkpointer: checkpointer
            .as_ref()
            .map(|c| c as &dyn tradelens_runner::Checkpointer),
    };

    let outcome = run_search(&strategies, &analysis.portfolio, hooks)?;
    print_search_summary(&outcome, analysis.portfolio.ranking_function);

    if let Some(path) = output {
        write_artifact(&path, &export_candidates_csv(&outcome.candidates)?)?;
        println!("Portfolios saved to: {}", path.display());
    }
    Ok(())
}

fn print_search_summary(outcome: &SearchOutcome, key: RankingKey) {
    println!(
        "Evaluated {} of {} portfolios in {:.2}s{}",
        outcome.evaluated,
        outcome.planned,
        outcome.elapsed_secs,
        if outcome.truncated { " (truncated)" } else { "" }
    );
    if outcome.candidates.is_empty() {
        println!("No viable portfolios.");
        return;
    }
    println!();
    println!(
        "{:>4}  {:<40} {:>14} {:>12} {:>10}",
        "Rank",
        "Portfolio",
        key.name(),
        "Net Profit",
        "Max DD"
    );
    println!("{}", "-".repeat(84));
    for (i, c) in outcome.candidates.iter().enumerate() {
        println!(
            "{:>4}  {:<40} {:>14.2} {:>12.2} {:>10.2}",
            i + 1,
            c.name(),
            c.score,
            c.metrics.net_profit,
            c.metrics.max_drawdown_dollar
        );
    }
}

fn run_monte_carlo_cmd(
    trades: &Path,
    analysis: &AnalysisConfig,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let ledger = read_ledger_file(trades)?;
    let result = simulate(&ledger, &analysis.monte_carlo)?;
    if result.is_empty() {
        println!("Nothing to simulate: the ledger has no trades.");
        return Ok(());
    }
    print_monte_carlo_summary(&result);

    if let Some(dir) = output_dir {
        write_artifact(&dir.join("summary.csv"), &export_summary_csv(&result)?)?;
        write_artifact(&dir.join("bands.csv"), &export_bands_csv(&result)?)?;
        write_artifact(&dir.join("result.json"), &export_monte_carlo_json(&result)?)?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn print_monte_carlo_summary(result: &MonteCarloResult) {
    println!(
        "{} runs ({:?}), seed {}, {}% band",
        result.iterations, result.method, result.seed, result.confidence_level
    );
    if let Some(last) = result.final_point() {
        println!(
            "Final cumulative profit: mean {:.2}, band [{:.2}, {:.2}]",
            last.mean, last.lower_bound, last.upper_bound
        );
    }
    println!();
    println!(
        "{:>6} {:>12} {:>10} {:>12} {:>10} {:>10}",
        "Conf%", "Net Profit", "Return%", "Max DD", "Ret/DD", "PF"
    );
    println!("{}", "-".repeat(65));
    for row in &result.summary {
        let ret = row
            .rate_of_return
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "n/a".into());
        println!(
            "{:>6} {:>12.2} {:>10} {:>12.2} {:>10.2} {:>10.2}",
            row.confidence,
            row.net_profit,
            ret,
            row.max_drawdown,
            row.return_drawdown_ratio,
            row.profit_factor
        );
    }
}
