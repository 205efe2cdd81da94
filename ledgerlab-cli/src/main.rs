//! LedgerLab CLI — backtest, live, signals and sweep commands.
//!
//! Commands:
//! - `backtest` — run a TOML config end to end and save artifacts
//! - `live` — paper-trade a config using only decisions up to an as-of date
//! - `signals` — write the decision table a config's strategy produces
//! - `sweep` — run a grid of crossover windows in parallel and tabulate them

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ledgerlab_runner::export::{decisions_file_name, export_decisions_csv, export_sweep_csv};
use ledgerlab_runner::{
    build_provider, load_prices, run_live, run_single_backtest, run_sweep, save_artifacts,
    BacktestConfig, BacktestResult, SweepEntry, SweepGrid,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "ledgerlab",
    about = "LedgerLab CLI — portfolio backtests from signal or weight tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest from a TOML config file.
    Backtest {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary without writing artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Paper-trade: act only on decisions dated on or before --as-of.
    Live {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Last decision date to act on (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Generate the decision table for a config's strategy and write it as CSV.
    Signals {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output file. Defaults to signals_actions.csv or daily_weights.csv.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Sweep moving-average crossover windows over the config's data.
    Sweep {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Fast windows, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [5, 10, 20])]
        fast: Vec<usize>,

        /// Slow windows, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [30, 50, 100])]
        slow: Vec<usize>,

        /// Write the results table to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            config,
            output_dir,
            no_save,
        } => run_backtest_cmd(&config, &output_dir, no_save),
        Commands::Live {
            config,
            as_of,
            output_dir,
        } => run_live_cmd(&config, as_of.as_deref(), &output_dir),
        Commands::Signals { config, output } => run_signals_cmd(&config, output),
        Commands::Sweep {
            config,
            fast,
            slow,
            output,
        } => run_sweep_cmd(&config, SweepGrid::new(fast, slow), output),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_backtest_cmd(config_path: &Path, output_dir: &Path, no_save: bool) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let result = run_single_backtest(&config)?;
    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_live_cmd(config_path: &Path, as_of: Option<&str>, output_dir: &Path) -> Result<()> {
    let as_of = match as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of date '{s}'"))?,
        None => chrono::Local::now().date_naive(),
    };

    let config = BacktestConfig::from_file(config_path)?;
    let result = run_live(&config, as_of)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_signals_cmd(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let data = load_prices(&config.data)?;
    let setup = build_provider(&config.strategy, config.backtest.mode)?;
    let decisions = setup.provider.decisions(&data.frame)?;

    let path = output.unwrap_or_else(|| PathBuf::from(decisions_file_name(&decisions)));
    std::fs::write(&path, export_decisions_csv(&decisions)?)
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(
        provider = setup.provider.name(),
        rows = decisions.len(),
        "decision table written"
    );
    for (ticker, origin) in &setup.forecast_origins {
        println!("{ticker}: forecast {origin}");
    }
    println!(
        "Wrote {} rows x {} tickers to {}",
        decisions.len(),
        decisions.tickers().len(),
        path.display()
    );
    Ok(())
}

fn run_sweep_cmd(config_path: &Path, grid: SweepGrid, output: Option<PathBuf>) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let data = load_prices(&config.data)?;
    let tickers = config.resolve_tickers(data.frame.tickers());
    let sim_config = config.to_sim_config(tickers)?;

    let entries = run_sweep(&data, &sim_config, &grid)?;
    print_sweep(&entries);

    if let Some(path) = output {
        std::fs::write(&path, export_sweep_csv(&entries)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Sweep table saved to: {}", path.display());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let ledger = &result.ledger;
    let fmt_date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());

    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", result.provider);
    println!("Mode:           {}", result.mode());
    println!("Tickers:        {}", result.config.tickers().join(", "));
    println!(
        "Period:         {} to {}",
        fmt_date(result.start_date),
        fmt_date(result.end_date)
    );
    if let Some(as_of) = result.as_of {
        println!("As of:          {as_of}");
    }
    println!("Rows:           {}", ledger.len());
    println!("Fills:          {}", ledger.fills().len());
    println!();

    println!("--- Ledger (last 5 rows) ---");
    println!("{}", ledger.column_names().join("  "));
    for row in ledger.tail(5) {
        let positions: Vec<String> = row.positions.iter().map(i64::to_string).collect();
        println!(
            "{}  {:.2}  {:.2}  {}",
            row.date,
            row.cash,
            row.total_value,
            positions.join("  ")
        );
    }
    println!();

    let m = &result.metrics;
    println!("--- Performance ---");
    println!("Initial Cash:   {:.2}", result.config.initial_cash());
    println!("Final Value:    {:.2}", m.final_value);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Annualized:     {:.2}%", m.annualized_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    if result.is_synthetic() {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_sweep(entries: &[SweepEntry]) {
    println!();
    println!("=== Crossover Sweep ({} runs) ===", entries.len());
    println!(
        "{:>5} {:>5} {:>12} {:>8} {:>10} {:>6}",
        "fast", "slow", "annualized", "sharpe", "max_dd", "fills"
    );
    for e in entries {
        println!(
            "{:>5} {:>5} {:>11.2}% {:>8.3} {:>9.2}% {:>6}",
            e.fast,
            e.slow,
            e.metrics.annualized_return * 100.0,
            e.metrics.sharpe,
            e.metrics.max_drawdown * 100.0,
            e.fill_count
        );
    }
}
