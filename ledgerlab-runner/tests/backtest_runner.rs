//! End-to-end runs through TOML config, CSV files on disk and artifact export.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ledgerlab_core::Mode;
use ledgerlab_runner::export::{export_ledger_csv, load_manifest};
use ledgerlab_runner::{
    run_live, run_single_backtest, save_artifacts, BacktestConfig, DataSource, RunError,
    SCHEMA_VERSION,
};

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Five dates of ticker X at a flat 100, open and close.
fn flat_prices(dir: &Path) -> (PathBuf, PathBuf) {
    let body = "Date,X\n\
                2024-01-01,100\n\
                2024-01-02,100\n\
                2024-01-03,100\n\
                2024-01-04,100\n\
                2024-01-05,100\n";
    (
        write_file(dir, "prices_open.csv", body),
        write_file(dir, "prices_close.csv", body),
    )
}

fn file_strategy_config(dir: &Path, decisions: &Path, extra_backtest: &str) -> BacktestConfig {
    let (open, close) = flat_prices(dir);
    let toml = format!(
        r#"[backtest]
initial_cash = 100000.0
mode = "signals"
{extra_backtest}

[data]
source = "wide_csv"
open = "{}"
close = "{}"

[strategy]
type = "file"
path = "{}"
"#,
        open.display(),
        close.display(),
        decisions.display()
    );
    BacktestConfig::from_toml(&toml).unwrap()
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[test]
fn signal_file_round_trip_through_runner() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write_file(
        dir.path(),
        "signals_actions.csv",
        "Date,X\n\
         2024-01-01,hold\n\
         2024-01-02,buy\n\
         2024-01-03,hold\n\
         2024-01-04,sell\n\
         2024-01-05,hold\n",
    );
    let config = file_strategy_config(dir.path(), &decisions, "");

    let result = run_single_backtest(&config).unwrap();
    let ledger = &result.ledger;

    assert_eq!(result.provider, "pass_through");
    assert_eq!(result.data_source, DataSource::WideCsv);
    assert_eq!(ledger.len(), 4);
    assert_eq!(ledger.position(1, "X"), Some(1000));
    assert!(ledger.rows()[1].cash.abs() < 1e-9);
    assert_eq!(ledger.position(3, "X"), Some(0));
    assert!((ledger.rows()[3].cash - 100_000.0).abs() < 1e-9);
    assert_eq!(ledger.final_value(), Some(100_000.0));

    assert_eq!(result.metrics.total_return, 0.0);
    assert_eq!(result.metrics.max_drawdown, 0.0);
    assert_eq!(result.start_date, Some(d(1)));
    assert_eq!(result.end_date, Some(d(4)));
}

#[test]
fn transaction_cost_changes_fill_size() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write_file(
        dir.path(),
        "signals_actions.csv",
        "Date,X\n2024-01-01,hold\n2024-01-02,buy\n2024-01-03,hold\n2024-01-04,hold\n2024-01-05,hold\n",
    );
    let config = file_strategy_config(dir.path(), &decisions, "transaction_cost_bps = 0.01");

    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.ledger.position(1, "X"), Some(990));
    assert!((result.ledger.rows()[1].cash - 10.0).abs() < 1e-6);

    let fill = &result.ledger.fills()[0];
    assert_eq!(fill.decision_date, d(2));
    assert_eq!(fill.execution_date, d(3));
    assert!((fill.price - 101.0).abs() < 1e-9);
}

#[test]
fn live_run_ignores_decisions_after_as_of() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write_file(
        dir.path(),
        "signals_actions.csv",
        "Date,X\n\
         2024-01-01,buy\n\
         2024-01-02,hold\n\
         2024-01-03,sell\n\
         2024-01-04,hold\n\
         2024-01-05,hold\n\
         2024-01-08,buy\n",
    );
    let config = file_strategy_config(dir.path(), &decisions, "");

    let result = run_live(&config, d(2)).unwrap();
    assert_eq!(result.as_of, Some(d(2)));
    // Rows after as_of are skipped, so the sell on the 3rd never happens.
    assert_eq!(result.ledger.len(), 2);
    assert_eq!(result.ledger.position(1, "X"), Some(1000));
    assert!(result.ledger.fills().iter().all(|f| f.decision_date <= d(2)));
}

#[test]
fn weights_file_follows_backtest_mode() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write_file(
        dir.path(),
        "daily_weights.csv",
        "Date,X,CASH\n\
         2024-01-01,0.5,0.5\n\
         2024-01-02,0.5,0.5\n\
         2024-01-03,0.5,0.5\n\
         2024-01-04,0.0,1.0\n\
         2024-01-05,0.0,1.0\n",
    );
    let mut config = file_strategy_config(dir.path(), &decisions, "");
    config.backtest.mode = Mode::Weights;

    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.mode(), Mode::Weights);
    assert_eq!(result.ledger.position(0, "X"), Some(500));
    assert_eq!(result.ledger.position(3, "X"), Some(0));
}

#[test]
fn missing_ticker_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write_file(dir.path(), "s.csv", "Date,Y\n2024-01-01,buy\n");
    let config = file_strategy_config(dir.path(), &decisions, "tickers = [\"Y\"]");
    assert!(matches!(
        run_single_backtest(&config),
        Err(RunError::Simulation(_))
    ));
}

#[test]
fn decision_file_covering_some_tickers_trades_only_those() {
    let dir = tempfile::tempdir().unwrap();
    let body = "Date,X,Y\n\
                2024-01-01,100,50\n\
                2024-01-02,100,50\n\
                2024-01-03,100,50\n";
    let open = write_file(dir.path(), "open_xy.csv", body);
    let close = write_file(dir.path(), "close_xy.csv", body);
    let decisions = write_file(
        dir.path(),
        "signals_actions.csv",
        "Date,X\n2024-01-01,buy\n2024-01-02,hold\n2024-01-03,hold\n",
    );
    let toml = format!(
        r#"[data]
source = "wide_csv"
open = "{}"
close = "{}"

[strategy]
type = "file"
path = "{}"
"#,
        open.display(),
        close.display(),
        decisions.display()
    );
    let config = BacktestConfig::from_toml(&toml).unwrap();
    assert!(config.backtest.tickers.is_none());

    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.config.tickers(), &["X".to_string()]);
    assert_eq!(result.ledger.tickers(), &["X".to_string()]);
    assert_eq!(result.ledger.position(0, "X"), Some(1000));
    assert_eq!(result.ledger.position(0, "Y"), None);
}

#[test]
fn artifacts_are_written_and_versioned() {
    let dir = tempfile::tempdir().unwrap();
    let decisions = write_file(
        dir.path(),
        "input_signals.csv",
        "Date,X\n2024-01-01,buy\n2024-01-02,hold\n2024-01-03,sell\n2024-01-04,hold\n2024-01-05,hold\n",
    );
    let config = file_strategy_config(dir.path(), &decisions, "");
    let result = run_single_backtest(&config).unwrap();

    let out = dir.path().join("results");
    let run_dir = save_artifacts(&result, &out).unwrap();

    for name in [
        "manifest.json",
        "ledger.csv",
        "fills.csv",
        "signals_actions.csv",
    ] {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }

    let ledger_csv = std::fs::read_to_string(run_dir.join("ledger.csv")).unwrap();
    assert_eq!(ledger_csv, export_ledger_csv(&result.ledger).unwrap());
    assert!(ledger_csv.starts_with("date,cash,total_value,pos_X\n"));

    let manifest = load_manifest(&run_dir).unwrap();
    assert_eq!(manifest["schema_version"], SCHEMA_VERSION);
    assert_eq!(manifest["run_id"], result.run_id.as_str());
    assert_eq!(manifest["dataset_hash"], result.dataset_hash.as_str());
    assert!(manifest.get("ledger").is_none());

    let fills = std::fs::read_to_string(run_dir.join("fills.csv")).unwrap();
    assert_eq!(fills.lines().count(), 3);
}

#[test]
fn synthetic_crossover_run_is_reproducible() {
    let toml = r#"
[backtest]
initial_cash = 100000.0

[data]
source = "synthetic"
tickers = ["AAA", "BBB", "CCC"]
start = "2023-01-02"
end = "2023-12-29"

[strategy]
type = "ma_crossover"
fast = 5
slow = 20
"#;
    let config = BacktestConfig::from_toml(toml).unwrap();
    let a = run_single_backtest(&config).unwrap();
    let b = run_single_backtest(&config).unwrap();

    assert!(a.is_synthetic());
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.dataset_hash, b.dataset_hash);
    assert_eq!(a.ledger, b.ledger);
    assert!(!a.ledger.fills().is_empty());
    for row in a.ledger.rows() {
        assert!(row.cash >= -1e-9 * row.total_value.abs().max(1.0));
    }
}

#[test]
fn forecast_strategy_carries_origins() {
    let dir = tempfile::tempdir().unwrap();
    let (open, close) = flat_prices(dir.path());
    let preds = write_file(
        dir.path(),
        "forecast.csv",
        "Date,X_actual,X_pred\n\
         2024-01-01,100,1\n\
         2024-01-02,100,2\n\
         2024-01-03,100,3\n\
         2024-01-04,100,4\n\
         2024-01-05,100,5\n",
    );
    let toml = format!(
        r#"[data]
source = "wide_csv"
open = "{}"
close = "{}"

[strategy]
type = "forecast_crossover"
predictions = "{}"
fast = 1
slow = 2
"#,
        open.display(),
        close.display(),
        preds.display()
    );
    let config = BacktestConfig::from_toml(&toml).unwrap();
    let result = run_single_backtest(&config).unwrap();

    assert_eq!(result.forecast_origins.len(), 1);
    assert_eq!(result.forecast_origins[0].0, "X");
    // Rising predictions: the first buy is decided on the 2nd, filled on the 3rd.
    assert_eq!(result.ledger.fills()[0].decision_date, d(2));
    assert_eq!(result.ledger.position(1, "X"), Some(1000));
}
