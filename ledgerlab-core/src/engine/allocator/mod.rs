//! Allocation step — turns one date's decisions into share and cash changes.
//!
//! Both decision modes sit behind [`Allocator`]. The simulator picks the
//! implementation once, from the decision-table variant, and the date loop
//! never branches on mode again.

mod signals;
mod weights;

pub use signals::SignalAllocator;
pub use weights::WeightAllocator;

use super::state::Book;
use super::SimError;
use crate::domain::{Fill, OrderSide, PriceField, PriceFrame};
use chrono::NaiveDate;

/// Trade instructions produced by an allocator for one date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeDelta {
    pub cash_delta: f64,
    /// Signed share change per config ticker.
    pub position_deltas: Vec<i64>,
    pub fills: Vec<Fill>,
}

impl TradeDelta {
    pub fn none(tickers: usize) -> Self {
        Self {
            cash_delta: 0.0,
            position_deltas: vec![0; tickers],
            fills: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Record a fill for ticker `i`, debiting or crediting its notional.
    fn record(&mut self, i: usize, fill: Fill) {
        self.position_deltas[i] += fill.signed_quantity();
        match fill.side {
            OrderSide::Buy => self.cash_delta -= fill.notional(),
            OrderSide::Sell => self.cash_delta += fill.notional(),
        }
        self.fills.push(fill);
    }
}

/// One simulated date: decisions from `date`, executions at `next_date`'s open.
///
/// Price accessors are indexed by config ticker and validate the price at
/// the point of use.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub date: NaiveDate,
    pub next_date: NaiveDate,
    /// Decision-table row for `date`, if the table has one.
    pub decision_row: Option<usize>,
    prices: &'a PriceFrame,
    date_idx: usize,
    columns: &'a [usize],
    tickers: &'a [String],
}

impl<'a> Step<'a> {
    /// `date_idx + 1` must be a valid frame index.
    pub(crate) fn new(
        prices: &'a PriceFrame,
        columns: &'a [usize],
        tickers: &'a [String],
        date_idx: usize,
        decision_row: Option<usize>,
    ) -> Self {
        let dates = prices.dates();
        Self {
            date: dates[date_idx],
            next_date: dates[date_idx + 1],
            decision_row,
            prices,
            date_idx,
            columns,
            tickers,
        }
    }

    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn ticker(&self, i: usize) -> &str {
        &self.tickers[i]
    }

    /// Open price at `next_date`, the execution price before frictions.
    pub fn next_open(&self, i: usize) -> Result<f64, SimError> {
        let value = self.prices.open(self.date_idx + 1, self.columns[i]);
        self.checked(value, self.next_date, i, PriceField::Open)
    }

    /// Close price at `date`, used for valuation.
    pub fn close(&self, i: usize) -> Result<f64, SimError> {
        let value = self.prices.close(self.date_idx, self.columns[i]);
        self.checked(value, self.date, i, PriceField::Close)
    }

    fn checked(
        &self,
        value: f64,
        date: NaiveDate,
        i: usize,
        field: PriceField,
    ) -> Result<f64, SimError> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(SimError::InvalidPrice {
                date,
                ticker: self.tickers[i].clone(),
                field,
                value,
            })
        }
    }

    fn fill(&self, i: usize, side: OrderSide, quantity: i64, raw_price: f64, price: f64) -> Fill {
        Fill {
            decision_date: self.date,
            execution_date: self.next_date,
            ticker: self.tickers[i].clone(),
            side,
            quantity,
            raw_price,
            price,
        }
    }
}

/// Mode-specific execution rule.
///
/// Implementations read the book but never mutate it; the simulator applies
/// the returned [`TradeDelta`].
pub trait Allocator: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, step: &Step<'_>, book: &Book) -> Result<TradeDelta, SimError>;
}

/// Round a share count toward zero to a whole number of lots.
fn round_to_lot(shares: i64, lot_size: i64) -> i64 {
    shares / lot_size * lot_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_lot_truncates_toward_zero() {
        assert_eq!(round_to_lot(1234, 100), 1200);
        assert_eq!(round_to_lot(-1234, 100), -1200);
        assert_eq!(round_to_lot(99, 100), 0);
        assert_eq!(round_to_lot(7, 1), 7);
    }

    #[test]
    fn trade_delta_record_tracks_cash() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut delta = TradeDelta::none(2);
        delta.record(
            1,
            Fill {
                decision_date: d,
                execution_date: d,
                ticker: "B".into(),
                side: OrderSide::Buy,
                quantity: 10,
                raw_price: 50.0,
                price: 50.5,
            },
        );
        delta.record(
            1,
            Fill {
                decision_date: d,
                execution_date: d,
                ticker: "B".into(),
                side: OrderSide::Sell,
                quantity: 4,
                raw_price: 50.0,
                price: 49.5,
            },
        );
        assert_eq!(delta.position_deltas, vec![0, 6]);
        assert!((delta.cash_delta - (-505.0 + 198.0)).abs() < 1e-10);
        assert!(!delta.is_empty());
    }
}
