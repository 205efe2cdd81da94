//! Ledger — the day-by-day record of cash, positions and portfolio value.

use crate::domain::fill::Fill;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Book state after one simulated date, valued at that date's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub cash: f64,
    pub total_value: f64,
    /// Whole shares per ticker, in ledger ticker order.
    pub positions: Vec<i64>,
}

impl LedgerRow {
    pub fn holdings_value(&self) -> f64 {
        self.total_value - self.cash
    }
}

/// Append-only result of a simulation. Read-only once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    tickers: Vec<String>,
    rows: Vec<LedgerRow>,
    fills: Vec<Fill>,
}

impl Ledger {
    pub(crate) fn new(tickers: Vec<String>) -> Self {
        Self {
            tickers,
            rows: Vec::new(),
            fills: Vec::new(),
        }
    }

    pub(crate) fn push_row(&mut self, row: LedgerRow) {
        debug_assert!(
            self.rows.last().map_or(true, |last| last.date < row.date),
            "ledger dates must be strictly increasing"
        );
        debug_assert_eq!(row.positions.len(), self.tickers.len());
        self.rows.push(row);
    }

    pub(crate) fn push_fills(&mut self, fills: impl IntoIterator<Item = Fill>) {
        self.fills.extend(fills);
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Portfolio value per row; the input to the evaluator.
    pub fn value_series(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.total_value).collect()
    }

    pub fn cash_series(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cash).collect()
    }

    pub fn position(&self, row: usize, ticker: &str) -> Option<i64> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        self.rows.get(row).map(|r| r.positions[col])
    }

    pub fn last(&self) -> Option<&LedgerRow> {
        self.rows.last()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.rows.last().map(|r| r.total_value)
    }

    /// Last `n` rows (fewer if the ledger is shorter).
    pub fn tail(&self, n: usize) -> &[LedgerRow] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }

    /// Column headers of the tabular form: `date,cash,total_value,pos_<T>...`.
    pub fn column_names(&self) -> Vec<String> {
        let mut cols = vec![
            "date".to_string(),
            "cash".to_string(),
            "total_value".to_string(),
        ];
        cols.extend(self.tickers.iter().map(|t| format!("pos_{t}")));
        cols
    }
}
