//! Decision tables — per-date, per-ticker instructions for the simulator.
//!
//! A table is either categorical signals (`buy`/`sell`/`hold`) or target
//! portfolio weights with a reserved `CASH` fraction. The two never mix
//! within one run: the variant fixes the mode.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Column name reserved for the cash fraction in weight tables.
pub const CASH_COLUMN: &str = "CASH";

#[derive(Debug, Error, PartialEq)]
pub enum DecisionError {
    #[error("unknown signal '{0}' (expected buy, sell or hold)")]
    UnknownSignal(String),

    #[error("unknown mode '{0}' (expected signals or weights)")]
    UnknownMode(String),

    #[error("decision table has no tickers")]
    NoTickers,

    #[error("duplicate ticker '{0}'")]
    DuplicateTicker(String),

    #[error("ticker column may not be named {CASH_COLUMN}")]
    ReservedTicker,

    #[error("decision dates are not strictly increasing at {date}")]
    UnsortedDates { date: NaiveDate },

    #[error("table has {rows} rows for {dates} dates")]
    RowCount { rows: usize, dates: usize },

    #[error("table has {got} ticker columns, expected {expected}")]
    ColumnCount { got: usize, expected: usize },

    #[error("row for {date} has {got} entries, expected {expected}")]
    RowWidth {
        date: NaiveDate,
        got: usize,
        expected: usize,
    },
}

// ─── Signal ──────────────────────────────────────────────────────────

/// Categorical per-ticker decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::Hold => "hold",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Signal::Buy),
            "sell" => Ok(Signal::Sell),
            "hold" => Ok(Signal::Hold),
            _ => Err(DecisionError::UnknownSignal(s.to_string())),
        }
    }
}

// ─── Mode ────────────────────────────────────────────────────────────

/// Allocation semantics of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Signals,
    Weights,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Signals => f.write_str("signals"),
            Mode::Weights => f.write_str("weights"),
        }
    }
}

impl FromStr for Mode {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signals" | "signal" => Ok(Mode::Signals),
            "weights" | "weight" => Ok(Mode::Weights),
            _ => Err(DecisionError::UnknownMode(s.to_string())),
        }
    }
}

// ─── Signal table ────────────────────────────────────────────────────

/// Row-major table of [`Signal`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    rows: Vec<Vec<Signal>>,
}

impl SignalTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        rows: Vec<Vec<Signal>>,
    ) -> Result<Self, DecisionError> {
        validate_header(&dates, &tickers)?;
        validate_rows(&dates, tickers.len(), rows.iter().map(Vec::len))?;
        Ok(Self {
            dates,
            tickers,
            rows,
        })
    }

    /// Build from one signal column per ticker (the shape generators emit).
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<Signal>>,
    ) -> Result<Self, DecisionError> {
        if columns.len() != tickers.len() {
            return Err(DecisionError::ColumnCount {
                got: columns.len(),
                expected: tickers.len(),
            });
        }
        for col in &columns {
            if col.len() != dates.len() {
                return Err(DecisionError::RowCount {
                    rows: col.len(),
                    dates: dates.len(),
                });
            }
        }
        let rows = (0..dates.len())
            .map(|r| columns.iter().map(|c| c[r]).collect())
            .collect();
        Self::new(dates, tickers, rows)
    }

    /// Every cell `hold`.
    pub fn all_hold(dates: Vec<NaiveDate>, tickers: Vec<String>) -> Result<Self, DecisionError> {
        let rows = vec![vec![Signal::Hold; tickers.len()]; dates.len()];
        Self::new(dates, tickers, rows)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn rows(&self) -> &[Vec<Signal>] {
        &self.rows
    }

    pub fn row(&self, date: NaiveDate) -> Option<&[Signal]> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.rows[i].as_slice())
    }

    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<Signal> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        self.row(date).map(|r| r[col])
    }

    /// Number of non-hold cells.
    pub fn action_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|s| **s != Signal::Hold)
            .count()
    }

    fn retain_dates(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        let (dates, rows) = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter(|(d, _)| keep(**d))
            .map(|(d, r)| (*d, r.clone()))
            .unzip();
        Self {
            dates,
            tickers: self.tickers.clone(),
            rows,
        }
    }
}

// ─── Weight table ────────────────────────────────────────────────────

/// One date's target allocation: per-ticker fractions plus the cash fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRow {
    pub weights: Vec<f64>,
    pub cash: f64,
}

impl WeightRow {
    pub fn new(weights: Vec<f64>, cash: f64) -> Self {
        Self { weights, cash }
    }

    /// Sum of all fractions including cash. Nominally 1.0.
    pub fn total(&self) -> f64 {
        self.weights.iter().sum::<f64>() + self.cash
    }
}

/// Row-major table of target weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    rows: Vec<WeightRow>,
}

impl WeightTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        rows: Vec<WeightRow>,
    ) -> Result<Self, DecisionError> {
        validate_header(&dates, &tickers)?;
        validate_rows(&dates, tickers.len(), rows.iter().map(|r| r.weights.len()))?;
        Ok(Self {
            dates,
            tickers,
            rows,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn rows(&self) -> &[WeightRow] {
        &self.rows
    }

    pub fn row(&self, date: NaiveDate) -> Option<&WeightRow> {
        self.dates.binary_search(&date).ok().map(|i| &self.rows[i])
    }

    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        self.row(date).map(|r| r.weights[col])
    }

    fn retain_dates(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        let (dates, rows) = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter(|(d, _)| keep(**d))
            .map(|(d, r)| (*d, r.clone()))
            .unzip();
        Self {
            dates,
            tickers: self.tickers.clone(),
            rows,
        }
    }
}

// ─── DecisionTable ───────────────────────────────────────────────────

/// Decisions for a whole run. The variant determines the allocation mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DecisionTable {
    Signals(SignalTable),
    Weights(WeightTable),
}

impl DecisionTable {
    pub fn mode(&self) -> Mode {
        match self {
            DecisionTable::Signals(_) => Mode::Signals,
            DecisionTable::Weights(_) => Mode::Weights,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        match self {
            DecisionTable::Signals(t) => t.dates(),
            DecisionTable::Weights(t) => t.dates(),
        }
    }

    pub fn tickers(&self) -> &[String] {
        match self {
            DecisionTable::Signals(t) => t.tickers(),
            DecisionTable::Weights(t) => t.tickers(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates().is_empty()
    }

    /// Row index for `date`, if the table has a decision for it.
    pub fn row_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates().binary_search(&date).ok()
    }

    pub fn ticker_index(&self, ticker: &str) -> Option<usize> {
        self.tickers().iter().position(|t| t == ticker)
    }

    /// Rows dated on or before `as_of`.
    pub fn until(&self, as_of: NaiveDate) -> Self {
        self.retain_dates(|d| d <= as_of)
    }

    /// Rows whose date also appears in `dates` (intersection).
    pub fn aligned_to(&self, dates: &[NaiveDate]) -> Self {
        let wanted: HashSet<NaiveDate> = dates.iter().copied().collect();
        self.retain_dates(|d| wanted.contains(&d))
    }

    fn retain_dates(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        match self {
            DecisionTable::Signals(t) => DecisionTable::Signals(t.retain_dates(keep)),
            DecisionTable::Weights(t) => DecisionTable::Weights(t.retain_dates(keep)),
        }
    }
}

impl From<SignalTable> for DecisionTable {
    fn from(t: SignalTable) -> Self {
        DecisionTable::Signals(t)
    }
}

impl From<WeightTable> for DecisionTable {
    fn from(t: WeightTable) -> Self {
        DecisionTable::Weights(t)
    }
}

fn validate_header(dates: &[NaiveDate], tickers: &[String]) -> Result<(), DecisionError> {
    if tickers.is_empty() {
        return Err(DecisionError::NoTickers);
    }
    let mut seen = HashSet::new();
    for t in tickers {
        if t == CASH_COLUMN {
            return Err(DecisionError::ReservedTicker);
        }
        if !seen.insert(t.as_str()) {
            return Err(DecisionError::DuplicateTicker(t.clone()));
        }
    }
    for w in dates.windows(2) {
        if w[1] <= w[0] {
            return Err(DecisionError::UnsortedDates { date: w[1] });
        }
    }
    Ok(())
}

fn validate_rows(
    dates: &[NaiveDate],
    width: usize,
    row_widths: impl ExactSizeIterator<Item = usize>,
) -> Result<(), DecisionError> {
    if row_widths.len() != dates.len() {
        return Err(DecisionError::RowCount {
            rows: row_widths.len(),
            dates: dates.len(),
        });
    }
    for (date, got) in dates.iter().zip(row_widths) {
        if got != width {
            return Err(DecisionError::RowWidth {
                date: *date,
                got,
                expected: width,
            });
        }
    }
    Ok(())
}
