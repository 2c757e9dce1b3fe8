//! Reporting and export — JSON, CSV, and plain-text artifacts.
//!
//! - **JSON**: metrics reports and search results, with non-finite ratios
//!   written as `"inf"` / `"-inf"` strings
//! - **CSV**: portfolio leaderboard, Monte Carlo summary table and
//!   per-trade confidence bands
//! - **Text**: a human-readable metrics report for the terminal

use std::path::Path;

use anyhow::{Context, Result};
use tradelens_core::MetricsReport;

use crate::monte_carlo::MonteCarloResult;
use crate::portfolio::PortfolioCandidate;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_metrics_json(report: &MetricsReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize MetricsReport to JSON")
}

pub fn export_candidates_json(candidates: &[PortfolioCandidate]) -> Result<String> {
    serde_json::to_string_pretty(candidates).context("failed to serialize candidates to JSON")
}

pub fn export_monte_carlo_json(result: &MonteCarloResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize MonteCarloResult to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the leaderboard, best first.
///
/// Columns: rank, portfolio, size, allocation, score, net_profit,
/// annualized_return, sharpe_ratio, max_drawdown, max_drawdown_pct,
/// profit_factor, recovery_factor, percent_profitable, total_trades
pub fn export_candidates_csv(candidates: &[PortfolioCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "portfolio",
        "size",
        "allocation",
        "score",
        "net_profit",
        "annualized_return",
        "sharpe_ratio",
        "max_drawdown",
        "max_drawdown_pct",
        "profit_factor",
        "recovery_factor",
        "percent_profitable",
        "total_trades",
    ])?;

    for (i, c) in candidates.iter().enumerate() {
        let m = &c.metrics;
        wtr.write_record([
            &(i + 1).to_string(),
            &c.name(),
            &c.size().to_string(),
            &format!("{:.4}", c.allocation),
            &format!("{:.4}", c.score),
            &format!("{:.2}", m.net_profit),
            &opt(m.annualized_return),
            &opt(m.sharpe_ratio),
            &format!("{:.2}", m.max_drawdown_dollar),
            &opt(m.max_drawdown_percent),
            &format!("{:.4}", m.profit_factor),
            &format!("{:.4}", m.recovery_factor),
            &format!("{:.2}", m.percent_profitable),
            &m.total_trades.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

/// Export the Monte Carlo summary table.
pub fn export_summary_csv(result: &MonteCarloResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "confidence",
        "net_profit",
        "rate_of_return",
        "max_drawdown",
        "max_drawdown_pct",
        "return_drawdown_ratio",
        "profit_factor",
    ])?;
    for row in &result.summary {
        wtr.write_record([
            &format!("{:.0}", row.confidence),
            &format!("{:.2}", row.net_profit),
            &opt(row.rate_of_return),
            &format!("{:.2}", row.max_drawdown),
            &opt(row.max_drawdown_pct),
            &format!("{:.4}", row.return_drawdown_ratio),
            &format!("{:.4}", row.profit_factor),
        ])?;
    }
    finish_csv(wtr)
}

/// Export the per-trade mean and confidence band.
pub fn export_bands_csv(result: &MonteCarloResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade_index", "mean", "lower_bound", "upper_bound"])?;
    for p in &result.points {
        wtr.write_record([
            &p.trade_index.to_string(),
            &format!("{:.2}", p.mean),
            &format!("{:.2}", p.lower_bound),
            &format!("{:.2}", p.upper_bound),
        ])?;
    }
    finish_csv(wtr)
}

/// Write an artifact, creating parent directories as needed.
pub fn write_artifact(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Text report ────────────────────────────────────────────────────

/// Plain-text metrics report for terminal output.
pub fn generate_report(report: &MetricsReport) -> String {
    fn pct(v: Option<f64>) -> String {
        v.map(|v| format!("{v:.2}%")).unwrap_or_else(|| "n/a".into())
    }
    fn ratio(v: f64) -> String {
        if v.is_infinite() {
            if v > 0.0 { "inf".into() } else { "-inf".into() }
        } else {
            format!("{v:.2}")
        }
    }

    let mut s = String::with_capacity(1024);
    s.push_str(&format!(
        "Performance summary (capital {:.2})\n",
        report.initial_capital
    ));
    s.push_str(&format!("  Net profit:            {:.2}\n", report.net_profit));
    s.push_str(&format!(
        "  Gross profit / loss:   {:.2} / {:.2}\n",
        report.gross_profit, report.gross_loss
    ));
    s.push_str(&format!("  Profit factor:         {}\n", ratio(report.profit_factor)));
    s.push_str(&format!("  Total return:          {}\n", pct(report.total_return_pct)));
    s.push_str(&format!("  Annualized return:     {}\n", pct(report.annualized_return)));
    s.push_str(&format!(
        "  Trades:                {} ({} won, {} lost, {} even)\n",
        report.total_trades, report.winning_trades, report.losing_trades, report.even_trades
    ));
    s.push_str(&format!("  Percent profitable:    {:.2}%\n", report.percent_profitable));
    s.push_str(&format!("  Avg trade:             {:.2}\n", report.avg_trade_net_profit));
    s.push_str(&format!(
        "  Avg win / avg loss:    {:.2} / {:.2} ({})\n",
        report.avg_winning_trade,
        report.avg_losing_trade,
        ratio(report.ratio_avg_win_avg_loss)
    ));
    s.push_str(&format!(
        "  Max consecutive:       {} wins, {} losses\n",
        report.max_consecutive_wins, report.max_consecutive_losses
    ));
    s.push_str(&format!(
        "  Max drawdown:          {:.2} ({} of peak profit, {} of peak equity)\n",
        report.max_drawdown_dollar,
        pct(report.max_drawdown_percent),
        pct(report.max_drawdown_equity_percent)
    ));
    s.push_str(&format!("  Recovery factor:       {}\n", ratio(report.recovery_factor)));
    s.push_str(&format!(
        "  Sharpe (monthly):      {}\n",
        report
            .sharpe_ratio
            .map(|v| format!("{v:.3}"))
            .unwrap_or_else(|| "n/a".into())
    ));
    s.push_str(&format!(
        "  Months traded:         {} ({} profitable)\n",
        report.months_traded,
        pct(report.percent_profitable_months)
    ));
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::{simulate, MonteCarloConfig};
    use crate::portfolio::evaluate_portfolio;
    use crate::ranking::RankingKey;
    use chrono::NaiveDate;
    use tradelens_core::{compute_metrics, StrategyLedger, Trade, TradeLedger};

    fn ledger() -> TradeLedger {
        let d = |day| {
            NaiveDate::from_ymd_opt(2024, 6, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        TradeLedger::new(vec![
            Trade {
                entry_date: d(1),
                entry_price: 10.0,
                exit_date: d(3),
                exit_price: 11.0,
                size: 10.0,
                net_profit: 10.0,
            },
            Trade {
                entry_date: d(4),
                entry_price: 11.0,
                exit_date: d(6),
                exit_price: 10.5,
                size: 10.0,
                net_profit: -5.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn candidates_csv_has_header_and_rows() {
        let strategies = vec![
            StrategyLedger::new("a", ledger()),
            StrategyLedger::new("b", ledger()),
        ];
        let c = evaluate_portfolio(&strategies, &[0, 1], 1_000.0, RankingKey::NetProfit).unwrap();
        let csv = export_candidates_csv(&[c]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("rank,portfolio,size"));
        assert!(lines[1].starts_with("1,a + b,2,0.5000"));
    }

    #[test]
    fn monte_carlo_csvs() {
        let config = MonteCarloConfig {
            iterations: 50,
            seed: Some(1),
            ..MonteCarloConfig::default()
        };
        let result = simulate(&ledger(), &config).unwrap();

        let bands = export_bands_csv(&result).unwrap();
        assert_eq!(bands.lines().count(), 1 + 3);
        assert!(bands.lines().nth(1).unwrap().starts_with("0,0.00,0.00,0.00"));

        let summary = export_summary_csv(&result).unwrap();
        assert_eq!(summary.lines().count(), 1 + 8);
    }

    #[test]
    fn metrics_json_writes_infinite_ratios_as_strings() {
        let winners = TradeLedger::new(vec![ledger().trades()[0].clone()]).unwrap();
        let report = compute_metrics(&winners, 1_000.0).unwrap();
        let json = export_metrics_json(&report).unwrap();
        assert!(json.contains("\"profit_factor\": \"inf\""));
        let back: MetricsReport = serde_json::from_str(&json).unwrap();
        assert!(back.profit_factor.is_infinite());
    }

    #[test]
    fn text_report_mentions_key_figures() {
        let report = compute_metrics(&ledger(), 1_000.0).unwrap();
        let text = generate_report(&report);
        assert!(text.contains("Net profit:            5.00"));
        assert!(text.contains("Profit factor:         2.00"));
        // Peak profit 10, trough 5.
        assert!(text.contains("Max drawdown:          -5.00 (-50.00% of peak profit"));
        assert_eq!(text.lines().count(), 15);
    }

    #[test]
    fn write_artifact_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("x.csv");
        write_artifact(&path, "a,b\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n");
    }
}
