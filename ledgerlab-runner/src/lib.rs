//! LedgerLab Runner — configuration, data loading, evaluation, export, sweeps.
//!
//! This crate builds on `ledgerlab-core` to provide:
//! - TOML backtest configuration with content-addressed run ids
//! - Price loading from wide or long CSV, or seeded synthetic data
//! - Reading external decision tables and predicted prices
//! - Single-run and live (as-of) runners with performance metrics
//! - CSV/JSON artifact export
//! - Parallel crossover parameter sweeps

pub mod config;
pub mod data_loader;
pub mod decision_io;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, DataSection, RunConfigError, RunId, StrategySection};
pub use data_loader::{load_prices, DataSource, LoadError, LoadedData};
pub use decision_io::{read_decisions, read_predictions_csv};
pub use export::save_artifacts;
pub use metrics::PerformanceMetrics;
pub use runner::{
    build_provider, run_backtest_from_data, run_live, run_single_backtest, BacktestResult,
    RunError, SCHEMA_VERSION,
};
pub use sweep::{run_sweep, SweepEntry, SweepGrid};
