//! Crossover signals over forecasted prices.
//!
//! The forecasting model itself lives outside this crate. It hands over one
//! predicted close series per ticker on a shared date axis, tagged with how
//! the series was produced. The tag is carried through for reporting and is
//! never consulted when generating signals.

use super::provider::DecisionProvider;
use super::{ma_crossover_signals, SignalError};
use crate::domain::{DecisionTable, PriceFrame, Signal, SignalTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a predicted series was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastOrigin {
    /// The model search converged; `label` names the chosen model.
    BestFit { label: String },
    /// The model could not be fitted and a simple extrapolation was used.
    Fallback,
    /// Read from a file with no model metadata.
    Imported { source: String },
}

impl fmt::Display for ForecastOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastOrigin::BestFit { label } => write!(f, "best_fit({label})"),
            ForecastOrigin::Fallback => f.write_str("fallback"),
            ForecastOrigin::Imported { source } => write!(f, "imported({source})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedSeries {
    /// One value per date of the owning [`PredictedPrices`]; NaN where undefined.
    pub values: Vec<f64>,
    pub origin: ForecastOrigin,
}

/// Predicted closes for several tickers on one date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedPrices {
    dates: Vec<NaiveDate>,
    series: BTreeMap<String, PredictedSeries>,
}

impl PredictedPrices {
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, SignalError> {
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SignalError::UnsortedDates { date: w[1] });
        }
        Ok(Self {
            dates,
            series: BTreeMap::new(),
        })
    }

    pub fn insert(
        &mut self,
        ticker: impl Into<String>,
        series: PredictedSeries,
    ) -> Result<(), SignalError> {
        let ticker = ticker.into();
        if series.values.len() != self.dates.len() {
            return Err(SignalError::LengthMismatch {
                ticker,
                got: series.values.len(),
                expected: self.dates.len(),
            });
        }
        self.series.insert(ticker, series);
        Ok(())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn get(&self, ticker: &str) -> Option<&PredictedSeries> {
        self.series.get(ticker)
    }

    /// Origin tag per ticker, for reporting.
    pub fn origins(&self) -> Vec<(String, ForecastOrigin)> {
        self.series
            .iter()
            .map(|(t, s)| (t.clone(), s.origin.clone()))
            .collect()
    }
}

/// Moving-average crossover applied to predicted rather than observed prices.
#[derive(Debug, Clone)]
pub struct ForecastCrossoverProvider {
    predictions: PredictedPrices,
    fast: usize,
    slow: usize,
}

impl ForecastCrossoverProvider {
    pub fn new(predictions: PredictedPrices, fast: usize, slow: usize) -> Result<Self, SignalError> {
        super::validate_windows(fast, slow)?;
        Ok(Self {
            predictions,
            fast,
            slow,
        })
    }

    pub fn predictions(&self) -> &PredictedPrices {
        &self.predictions
    }

    /// Signals over the whole forecast horizon, including dates past the
    /// last observed price. Tickers without a predicted series hold.
    pub fn signal_table(&self, tickers: &[String]) -> Result<SignalTable, SignalError> {
        let n = self.predictions.dates.len();
        let columns = tickers
            .iter()
            .map(|t| match self.predictions.get(t) {
                Some(series) => ma_crossover_signals(&series.values, self.fast, self.slow),
                None => Ok(vec![Signal::Hold; n]),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SignalTable::from_columns(
            self.predictions.dates.clone(),
            tickers.to_vec(),
            columns,
        )?)
    }
}

impl DecisionProvider for ForecastCrossoverProvider {
    fn name(&self) -> &str {
        "forecast_crossover"
    }

    fn decisions(&self, prices: &PriceFrame) -> Result<DecisionTable, SignalError> {
        let table = DecisionTable::from(self.signal_table(prices.tickers())?);
        Ok(table.aligned_to(prices.dates()))
    }
}
