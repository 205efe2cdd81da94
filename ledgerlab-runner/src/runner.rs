//! Backtest runner — wires together data, decision providers, the simulator
//! and metrics.
//!
//! Entry points:
//! - `run_single_backtest()`: loads prices from the config, then runs. Used by the CLI.
//! - `run_live()`: same, but only decisions dated on or before `as_of` are acted on.
//! - `run_backtest_from_data()`: pre-loaded prices and a provider. Used by sweeps.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use ledgerlab_core::signals::{
    DecisionProvider, ForecastCrossoverProvider, ForecastOrigin, MaCrossoverProvider, PassThrough,
    PositionOutput, SignalError, SmaPositionProvider,
};
use ledgerlab_core::{run_backtest, ConfigError, DecisionTable, Ledger, Mode, SimConfig, SimError};

use crate::config::{BacktestConfig, RunConfigError, RunId, StrategySection};
use crate::data_loader::{load_prices, DataSource, LoadError, LoadedData};
use crate::decision_io::{read_decisions, read_predictions_csv};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] RunConfigError),
    #[error("simulation config error: {0}")]
    SimConfig(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimError),
    #[error("crossover sweeps produce signals, but the config mode is {0}")]
    SweepMode(Mode),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub schema_version: u32,
    pub run_id: RunId,
    pub provider: String,
    pub config: SimConfig,
    pub metrics: PerformanceMetrics,
    pub dataset_hash: String,
    pub data_source: DataSource,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Only decisions dated on or before this were used (live runs).
    pub as_of: Option<NaiveDate>,
    /// Per-ticker origin of predicted series, for forecast-driven runs.
    pub forecast_origins: Vec<(String, ForecastOrigin)>,
    #[serde(skip)]
    pub decisions: DecisionTable,
    #[serde(skip)]
    pub ledger: Ledger,
}

impl BacktestResult {
    pub fn mode(&self) -> Mode {
        self.config.mode()
    }

    pub fn is_synthetic(&self) -> bool {
        self.data_source == DataSource::Synthetic
    }
}

/// A decision provider built from a `[strategy]` section.
pub struct StrategySetup {
    pub provider: Box<dyn DecisionProvider>,
    pub forecast_origins: Vec<(String, ForecastOrigin)>,
}

/// Build the provider for a strategy. `mode` decides how a decision file is parsed.
pub fn build_provider(strategy: &StrategySection, mode: Mode) -> Result<StrategySetup, RunError> {
    let mut forecast_origins = Vec::new();
    let provider: Box<dyn DecisionProvider> = match strategy {
        StrategySection::MaCrossover { fast, slow } => {
            Box::new(MaCrossoverProvider::new(*fast, *slow)?)
        }
        StrategySection::SmaPosition {
            short,
            long,
            weights,
        } => {
            let output = match weights {
                Some(w) => PositionOutput::Weights {
                    cash_buffer: w.cash_buffer,
                    rebalance: w.rebalance,
                },
                None => PositionOutput::Signals,
            };
            Box::new(SmaPositionProvider::new(*short, *long, output)?)
        }
        StrategySection::ForecastCrossover {
            predictions,
            fast,
            slow,
        } => {
            let preds = read_predictions_csv(predictions)?;
            forecast_origins = preds.origins();
            Box::new(ForecastCrossoverProvider::new(preds, *fast, *slow)?)
        }
        StrategySection::File { path } => Box::new(PassThrough(read_decisions(path, mode)?)),
    };
    Ok(StrategySetup {
        provider,
        forecast_origins,
    })
}

/// Load prices, build the strategy and run it end to end.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    run_configured(config, None)
}

/// Paper-trade up to `as_of`: decisions after it are dropped and the rest
/// are kept only on dates the price data covers.
pub fn run_live(config: &BacktestConfig, as_of: NaiveDate) -> Result<BacktestResult, RunError> {
    run_configured(config, Some(as_of))
}

fn run_configured(
    config: &BacktestConfig,
    as_of: Option<NaiveDate>,
) -> Result<BacktestResult, RunError> {
    let data = load_prices(&config.data)?;
    let setup = build_provider(&config.strategy, config.backtest.mode)?;
    let run_id = config.run_id()?;

    let decisions = setup.provider.decisions(&data.frame)?;
    let decisions = match as_of {
        Some(date) => decisions.until(date).aligned_to(data.frame.dates()),
        None => decisions,
    };
    // Unless configured, trade whatever the decision table covers.
    let tickers = config.resolve_tickers(decisions.tickers());
    let sim_config = config.to_sim_config(tickers)?;

    let mut result = run_decisions(
        &data,
        decisions,
        setup.provider.name(),
        &sim_config,
        run_id,
    )?;
    result.as_of = as_of;
    result.forecast_origins = setup.forecast_origins;
    Ok(result)
}

/// Run a backtest with pre-loaded data. No I/O.
pub fn run_backtest_from_data(
    data: &LoadedData,
    provider: &dyn DecisionProvider,
    config: &SimConfig,
    run_id: RunId,
) -> Result<BacktestResult, RunError> {
    let decisions = provider.decisions(&data.frame)?;
    run_decisions(data, decisions, provider.name(), config, run_id)
}

fn run_decisions(
    data: &LoadedData,
    decisions: DecisionTable,
    provider: &str,
    config: &SimConfig,
    run_id: RunId,
) -> Result<BacktestResult, RunError> {
    let ledger = run_backtest(&data.frame, &decisions, config)?;
    let metrics = PerformanceMetrics::compute(&ledger.value_series());

    info!(
        provider,
        mode = %config.mode(),
        rows = ledger.len(),
        fills = ledger.fills().len(),
        annualized_return = metrics.annualized_return,
        sharpe = metrics.sharpe,
        max_drawdown = metrics.max_drawdown,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        provider: provider.to_string(),
        config: config.clone(),
        metrics,
        dataset_hash: data.dataset_hash.clone(),
        data_source: data.source,
        start_date: ledger.rows().first().map(|r| r.date),
        end_date: ledger.last().map(|r| r.date),
        as_of: None,
        forecast_origins: Vec::new(),
        decisions,
        ledger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightsSection;
    use crate::data_loader::generate_synthetic;
    use ledgerlab_core::signals::Rebalance;

    fn synthetic_data() -> LoadedData {
        let frame = generate_synthetic(
            &["AAA".to_string(), "BBB".to_string()],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        )
        .unwrap();
        LoadedData::new(frame, DataSource::Synthetic)
    }

    #[test]
    fn build_provider_names() {
        let setup = build_provider(&StrategySection::default(), Mode::Signals).unwrap();
        assert_eq!(setup.provider.name(), "ma_crossover");
        assert!(setup.forecast_origins.is_empty());

        let weights = StrategySection::SmaPosition {
            short: 5,
            long: 20,
            weights: Some(WeightsSection {
                cash_buffer: 0.2,
                rebalance: Rebalance::Daily,
            }),
        };
        let setup = build_provider(&weights, Mode::Weights).unwrap();
        assert_eq!(setup.provider.name(), "sma_equal_weight");
    }

    #[test]
    fn build_provider_rejects_bad_windows() {
        let bad = StrategySection::MaCrossover { fast: 30, slow: 10 };
        assert!(matches!(
            build_provider(&bad, Mode::Signals),
            Err(RunError::Signal(SignalError::InvalidWindows { .. }))
        ));
    }

    #[test]
    fn run_from_data_scores_ledger() {
        let data = synthetic_data();
        let provider = MaCrossoverProvider::new(5, 20).unwrap();
        let config = SimConfig::builder(100_000.0, Mode::Signals, data.frame.tickers().to_vec())
            .build()
            .unwrap();

        let result = run_backtest_from_data(&data, &provider, &config, "id".into()).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.provider, "ma_crossover");
        assert_eq!(result.ledger.len(), data.frame.len() - 1);
        assert_eq!(
            result.metrics,
            PerformanceMetrics::compute(&result.ledger.value_series())
        );
        assert_eq!(result.start_date, Some(data.frame.dates()[0]));
        assert!(result.is_synthetic());
    }

    #[test]
    fn mode_mismatch_surfaces_as_simulation_error() {
        let data = synthetic_data();
        let provider = MaCrossoverProvider::default();
        let config = SimConfig::builder(100_000.0, Mode::Weights, data.frame.tickers().to_vec())
            .build()
            .unwrap();
        assert!(matches!(
            run_backtest_from_data(&data, &provider, &config, "id".into()),
            Err(RunError::Simulation(SimError::ModeMismatch { .. }))
        ));
    }
}
