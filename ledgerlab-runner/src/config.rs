//! TOML backtest configuration.
//!
//! A config file has three sections:
//!
//! ```toml
//! [backtest]
//! initial_cash = 100000.0
//! mode = "signals"
//!
//! [data]
//! source = "wide_csv"
//! open = "data/prices_open.csv"
//! close = "data/prices_close.csv"
//!
//! [strategy]
//! type = "ma_crossover"
//! fast = 10
//! slow = 30
//! ```
//!
//! Everything except the section headers has a default.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ledgerlab_core::signals::Rebalance;
use ledgerlab_core::{ConfigError, MissingDecisionPolicy, Mode, SimConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Sim(#[from] ConfigError),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Top-level config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub strategy: StrategySection,
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, RunConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-section checks that serde cannot express.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        if let Some(mode) = self.strategy.mode() {
            if mode != self.backtest.mode {
                return Err(RunConfigError::Invalid(format!(
                    "strategy '{}' produces {mode} but backtest.mode is {}",
                    self.strategy.name(),
                    self.backtest.mode
                )));
            }
        }
        if let DataSection::Synthetic {
            tickers,
            start,
            end,
        } = &self.data
        {
            if tickers.is_empty() {
                return Err(RunConfigError::Invalid(
                    "synthetic data needs at least one ticker".into(),
                ));
            }
            if end < start {
                return Err(RunConfigError::Invalid(format!(
                    "synthetic end {end} is before start {start}"
                )));
            }
        }
        Ok(())
    }

    /// Tickers to simulate: the configured list, or every ticker in `available`.
    pub fn resolve_tickers(&self, available: &[String]) -> Vec<String> {
        match &self.backtest.tickers {
            Some(tickers) => tickers.clone(),
            None => available.to_vec(),
        }
    }

    /// Build the validated engine config for the given tickers.
    pub fn to_sim_config(&self, tickers: Vec<String>) -> Result<SimConfig, ConfigError> {
        let b = &self.backtest;
        SimConfig::builder(b.initial_cash, b.mode, tickers)
            .transaction_cost_bps(b.transaction_cost_bps)
            .slippage_bps(b.slippage_bps)
            .lot_size(b.lot_size)
            .allow_short(b.allow_short)
            .missing_decisions(b.missing_decisions)
            .build()
    }

    /// BLAKE3 hash of the canonical JSON form. Identical configs share an id.
    pub fn run_id(&self) -> Result<RunId, RunConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

// ─── [backtest] ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestSection {
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Defaults to every ticker in the loaded data.
    #[serde(default)]
    pub tickers: Option<Vec<String>>,
    /// Fractional rate: 0.0001 is one basis point.
    #[serde(default)]
    pub transaction_cost_bps: f64,
    /// Fractional rate, added to the transaction cost.
    #[serde(default)]
    pub slippage_bps: f64,
    #[serde(default = "default_lot_size")]
    pub lot_size: u32,
    #[serde(default)]
    pub allow_short: bool,
    #[serde(default)]
    pub missing_decisions: MissingDecisionPolicy,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
            mode: default_mode(),
            tickers: None,
            transaction_cost_bps: 0.0,
            slippage_bps: 0.0,
            lot_size: default_lot_size(),
            allow_short: false,
            missing_decisions: MissingDecisionPolicy::default(),
        }
    }
}

fn default_initial_cash() -> f64 {
    100_000.0
}

fn default_mode() -> Mode {
    Mode::Signals
}

fn default_lot_size() -> u32 {
    1
}

// ─── [data] ─────────────────────────────────────────────────────────

/// Where prices come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataSection {
    /// Two wide files (date column, then one column per ticker).
    WideCsv {
        #[serde(default = "default_open_path")]
        open: PathBuf,
        #[serde(default = "default_close_path")]
        close: PathBuf,
    },
    /// One file with `date,ticker,open,close` rows.
    LongCsv { path: PathBuf },
    /// Seeded random walk on business days. Results are tagged synthetic.
    Synthetic {
        tickers: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl Default for DataSection {
    fn default() -> Self {
        DataSection::WideCsv {
            open: default_open_path(),
            close: default_close_path(),
        }
    }
}

fn default_open_path() -> PathBuf {
    PathBuf::from("data/prices_open.csv")
}

fn default_close_path() -> PathBuf {
    PathBuf::from("data/prices_close.csv")
}

// ─── [strategy] ─────────────────────────────────────────────────────

/// Which decision provider drives the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategySection {
    /// Crossover of two simple moving averages of the close.
    MaCrossover {
        #[serde(default = "default_fast")]
        fast: usize,
        #[serde(default = "default_slow")]
        slow: usize,
    },
    /// Lagged SMA position flag; emits equal weights when `weights` is set.
    SmaPosition {
        #[serde(default = "default_short")]
        short: usize,
        #[serde(default = "default_long")]
        long: usize,
        #[serde(default)]
        weights: Option<WeightsSection>,
    },
    /// Crossover over predicted closes read from a `<T>_pred` CSV.
    ForecastCrossover {
        predictions: PathBuf,
        #[serde(default = "default_fast")]
        fast: usize,
        #[serde(default = "default_slow")]
        slow: usize,
    },
    /// Precomputed decision table; parsed according to `backtest.mode`.
    File { path: PathBuf },
}

impl StrategySection {
    pub fn name(&self) -> &'static str {
        match self {
            StrategySection::MaCrossover { .. } => "ma_crossover",
            StrategySection::SmaPosition { .. } => "sma_position",
            StrategySection::ForecastCrossover { .. } => "forecast_crossover",
            StrategySection::File { .. } => "file",
        }
    }

    /// Mode the strategy produces, or `None` when it follows `backtest.mode`.
    pub fn mode(&self) -> Option<Mode> {
        match self {
            StrategySection::MaCrossover { .. } | StrategySection::ForecastCrossover { .. } => {
                Some(Mode::Signals)
            }
            StrategySection::SmaPosition { weights: None, .. } => Some(Mode::Signals),
            StrategySection::SmaPosition {
                weights: Some(_), ..
            } => Some(Mode::Weights),
            StrategySection::File { .. } => None,
        }
    }
}

impl Default for StrategySection {
    fn default() -> Self {
        StrategySection::MaCrossover {
            fast: default_fast(),
            slow: default_slow(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsSection {
    #[serde(default = "default_cash_buffer")]
    pub cash_buffer: f64,
    #[serde(default)]
    pub rebalance: Rebalance,
}

fn default_fast() -> usize {
    10
}

fn default_slow() -> usize {
    30
}

fn default_short() -> usize {
    20
}

fn default_long() -> usize {
    50
}

fn default_cash_buffer() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[backtest]
initial_cash = 50000.0
mode = "weights"
tickers = ["AAPL", "MSFT"]
transaction_cost_bps = 0.0005
slippage_bps = 0.0002
lot_size = 10
missing_decisions = "hold"

[data]
source = "long_csv"
path = "prices.csv"

[strategy]
type = "sma_position"
short = 5
long = 15

[strategy.weights]
cash_buffer = 0.1
rebalance = "on_signal"
"#;

    #[test]
    fn parses_every_field() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(config.backtest.initial_cash, 50_000.0);
        assert_eq!(config.backtest.mode, Mode::Weights);
        assert_eq!(
            config.backtest.tickers,
            Some(vec!["AAPL".to_string(), "MSFT".to_string()])
        );
        assert_eq!(config.backtest.lot_size, 10);
        assert_eq!(config.backtest.missing_decisions, MissingDecisionPolicy::Hold);
        assert_eq!(
            config.data,
            DataSection::LongCsv {
                path: PathBuf::from("prices.csv")
            }
        );
        assert_eq!(
            config.strategy,
            StrategySection::SmaPosition {
                short: 5,
                long: 15,
                weights: Some(WeightsSection {
                    cash_buffer: 0.1,
                    rebalance: Rebalance::OnSignal
                }),
            }
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = BacktestConfig::from_toml("").unwrap();
        assert_eq!(config.backtest, BacktestSection::default());
        assert_eq!(config.data, DataSection::default());
        assert_eq!(
            config.strategy,
            StrategySection::MaCrossover { fast: 10, slow: 30 }
        );
    }

    #[test]
    fn strategy_mode_must_match_backtest_mode() {
        let toml = r#"
[backtest]
mode = "weights"

[strategy]
type = "ma_crossover"
"#;
        let err = BacktestConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, RunConfigError::Invalid(_)));
        assert!(err.to_string().contains("ma_crossover"));
    }

    #[test]
    fn file_strategy_follows_backtest_mode() {
        let toml = r#"
[backtest]
mode = "weights"

[strategy]
type = "file"
path = "daily_weights.csv"
"#;
        let config = BacktestConfig::from_toml(toml).unwrap();
        assert_eq!(config.strategy.mode(), None);
    }

    #[test]
    fn synthetic_range_is_checked() {
        let toml = r#"
[data]
source = "synthetic"
tickers = ["AAA"]
start = "2024-03-01"
end = "2024-01-01"
"#;
        assert!(matches!(
            BacktestConfig::from_toml(toml),
            Err(RunConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_backtest_key_is_rejected() {
        let toml = "[backtest]\ninital_cash = 5.0\n";
        assert!(matches!(
            BacktestConfig::from_toml(toml),
            Err(RunConfigError::Parse(_))
        ));
    }

    #[test]
    fn to_sim_config_validates() {
        let mut config = BacktestConfig::from_toml("").unwrap();
        let sim = config.to_sim_config(vec!["X".into()]).unwrap();
        assert_eq!(sim.initial_cash(), 100_000.0);
        assert_eq!(sim.tickers(), ["X".to_string()]);

        config.backtest.initial_cash = -1.0;
        assert_eq!(
            config.to_sim_config(vec!["X".into()]).unwrap_err(),
            ConfigError::InvalidInitialCash(-1.0)
        );
    }

    #[test]
    fn resolve_tickers_prefers_configured_list() {
        let mut config = BacktestConfig::from_toml("").unwrap();
        let available = vec!["A".to_string(), "B".to_string()];
        assert_eq!(config.resolve_tickers(&available), available);

        config.backtest.tickers = Some(vec!["B".into()]);
        assert_eq!(config.resolve_tickers(&available), vec!["B".to_string()]);
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = BacktestConfig::from_toml(FULL).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());

        b.backtest.lot_size = 1;
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);
    }
}
