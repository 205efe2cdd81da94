//! PriceFrame — aligned open/close matrices over a shared date axis.
//!
//! Prices are stored column-major (one `Vec<f64>` per ticker, aligned to
//! `dates`). Missing observations are `NaN`; nothing here fills or zeroes
//! them. The simulator decides at the point of use whether a price is valid.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Structural errors raised while building a [`PriceFrame`].
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("price frame has no tickers")]
    NoTickers,

    #[error("duplicate ticker '{0}'")]
    DuplicateTicker(String),

    #[error("dates are not strictly increasing at {date}")]
    UnsortedDates { date: NaiveDate },

    #[error("{field} matrix has {got} ticker columns, expected {expected}")]
    ColumnCount {
        field: PriceField,
        got: usize,
        expected: usize,
    },

    #[error("{field} prices for '{ticker}' have {got} rows, expected {expected}")]
    RaggedSeries {
        ticker: String,
        field: PriceField,
        got: usize,
        expected: usize,
    },

    #[error("open and close tables disagree: {0}")]
    Misaligned(String),
}

/// Which price of the bar is being referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    Close,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceField::Open => f.write_str("open"),
            PriceField::Close => f.write_str("close"),
        }
    }
}

/// One price field (open or close) for a set of tickers, as read from a
/// wide table. Two of these combine into a [`PriceFrame`].
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    /// One column per ticker, each aligned to `dates`.
    pub columns: Vec<Vec<f64>>,
}

/// Open and close prices for a fixed ticker set on a strictly increasing
/// date axis. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFrame {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    open: Vec<Vec<f64>>,
    close: Vec<Vec<f64>>,
}

impl PriceFrame {
    /// Build a frame from column-major open/close matrices.
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        open: Vec<Vec<f64>>,
        close: Vec<Vec<f64>>,
    ) -> Result<Self, FrameError> {
        validate_tickers(&tickers)?;
        validate_dates(&dates)?;
        validate_matrix(PriceField::Open, &open, &tickers, dates.len())?;
        validate_matrix(PriceField::Close, &close, &tickers, dates.len())?;

        Ok(Self {
            dates,
            tickers,
            open,
            close,
        })
    }

    /// Combine separately loaded open and close tables.
    ///
    /// Both tables must cover the same dates and the same ticker set. Close
    /// columns are reordered to follow the open table's ticker order.
    pub fn from_tables(open: PriceTable, close: PriceTable) -> Result<Self, FrameError> {
        if open.dates != close.dates {
            let detail = match open
                .dates
                .iter()
                .zip(close.dates.iter())
                .find(|(a, b)| a != b)
            {
                Some((a, b)) => format!("open has {a} where close has {b}"),
                None => format!(
                    "open has {} dates, close has {}",
                    open.dates.len(),
                    close.dates.len()
                ),
            };
            return Err(FrameError::Misaligned(detail));
        }

        if open.columns.len() != open.tickers.len() {
            return Err(FrameError::ColumnCount {
                field: PriceField::Open,
                got: open.columns.len(),
                expected: open.tickers.len(),
            });
        }
        if close.columns.len() != close.tickers.len() {
            return Err(FrameError::ColumnCount {
                field: PriceField::Close,
                got: close.columns.len(),
                expected: close.tickers.len(),
            });
        }

        let mut close_columns = Vec::with_capacity(open.tickers.len());
        for ticker in &open.tickers {
            let idx = close
                .tickers
                .iter()
                .position(|t| t == ticker)
                .ok_or_else(|| {
                    FrameError::Misaligned(format!("ticker '{ticker}' has no close column"))
                })?;
            close_columns.push(close.columns[idx].clone());
        }
        if close.tickers.len() != open.tickers.len() {
            let extra: Vec<&str> = close
                .tickers
                .iter()
                .filter(|t| !open.tickers.contains(t))
                .map(|t| t.as_str())
                .collect();
            return Err(FrameError::Misaligned(format!(
                "close has tickers without an open column: {}",
                extra.join(", ")
            )));
        }

        Self::new(open.dates, open.tickers, open.columns, close_columns)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn ticker_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Raw open price; may be NaN.
    pub fn open(&self, date_idx: usize, ticker_idx: usize) -> f64 {
        self.open[ticker_idx][date_idx]
    }

    /// Raw close price; may be NaN.
    pub fn close(&self, date_idx: usize, ticker_idx: usize) -> f64 {
        self.close[ticker_idx][date_idx]
    }

    pub fn price(&self, field: PriceField, date_idx: usize, ticker_idx: usize) -> f64 {
        match field {
            PriceField::Open => self.open(date_idx, ticker_idx),
            PriceField::Close => self.close(date_idx, ticker_idx),
        }
    }

    pub fn open_series(&self, ticker: &str) -> Option<&[f64]> {
        self.ticker_index(ticker).map(|i| self.open[i].as_slice())
    }

    pub fn close_series(&self, ticker: &str) -> Option<&[f64]> {
        self.ticker_index(ticker).map(|i| self.close[i].as_slice())
    }

    /// Count of NaN cells per ticker across both fields.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.tickers
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let missing = self.open[i].iter().filter(|v| v.is_nan()).count()
                    + self.close[i].iter().filter(|v| v.is_nan()).count();
                (t.clone(), missing)
            })
            .collect()
    }
}

fn validate_tickers(tickers: &[String]) -> Result<(), FrameError> {
    if tickers.is_empty() {
        return Err(FrameError::NoTickers);
    }
    let mut seen = HashSet::new();
    for t in tickers {
        if !seen.insert(t.as_str()) {
            return Err(FrameError::DuplicateTicker(t.clone()));
        }
    }
    Ok(())
}

fn validate_dates(dates: &[NaiveDate]) -> Result<(), FrameError> {
    for w in dates.windows(2) {
        if w[1] <= w[0] {
            return Err(FrameError::UnsortedDates { date: w[1] });
        }
    }
    Ok(())
}

fn validate_matrix(
    field: PriceField,
    columns: &[Vec<f64>],
    tickers: &[String],
    rows: usize,
) -> Result<(), FrameError> {
    if columns.len() != tickers.len() {
        return Err(FrameError::ColumnCount {
            field,
            got: columns.len(),
            expected: tickers.len(),
        });
    }
    for (col, ticker) in columns.iter().zip(tickers) {
        if col.len() != rows {
            return Err(FrameError::RaggedSeries {
                ticker: ticker.clone(),
                field,
                got: col.len(),
                expected: rows,
            });
        }
    }
    Ok(())
}
