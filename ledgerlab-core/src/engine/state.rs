//! Mutable book state that evolves date-by-date during a simulation.

use super::allocator::{Step, TradeDelta};
use super::SimError;

/// Cash plus whole-share positions, in config ticker order.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    cash: f64,
    shares: Vec<i64>,
}

impl Book {
    pub fn new(initial_cash: f64, tickers: usize) -> Self {
        Self {
            cash: initial_cash,
            shares: vec![0; tickers],
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn shares(&self) -> &[i64] {
        &self.shares
    }

    pub fn apply(&mut self, delta: &TradeDelta) {
        self.cash += delta.cash_delta;
        for (held, change) in self.shares.iter_mut().zip(&delta.position_deltas) {
            *held += change;
        }
    }

    /// Value the book at the step's close prices.
    ///
    /// Only non-zero positions need a valid close; a NaN close on a flat
    /// ticker is fine.
    pub fn mark_to_market(&self, step: &Step<'_>) -> Result<f64, SimError> {
        let mut holdings = 0.0;
        for (i, &held) in self.shares.iter().enumerate() {
            if held != 0 {
                holdings += held as f64 * step.close(i)?;
            }
        }
        Ok(self.cash + holdings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_book_is_flat() {
        let book = Book::new(50_000.0, 3);
        assert_eq!(book.cash(), 50_000.0);
        assert_eq!(book.shares(), &[0, 0, 0]);
    }

    #[test]
    fn apply_moves_cash_and_shares() {
        let mut book = Book::new(1_000.0, 2);
        book.apply(&TradeDelta {
            cash_delta: -400.0,
            position_deltas: vec![4, 0],
            fills: Vec::new(),
        });
        book.apply(&TradeDelta {
            cash_delta: 100.0,
            position_deltas: vec![-1, 0],
            fills: Vec::new(),
        });
        assert_eq!(book.cash(), 700.0);
        assert_eq!(book.shares(), &[3, 0]);
    }
}
