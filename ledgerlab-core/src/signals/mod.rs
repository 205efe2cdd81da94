//! Decision-table generators.
//!
//! Everything here reads prices only (observed or predicted) and never the
//! simulator's book. Generators emit per-ticker columns aligned to the input
//! series; providers assemble them into a [`DecisionTable`](crate::domain::DecisionTable).

pub mod crossover;
pub mod forecast;
pub mod position;
pub mod provider;
pub mod weights;

pub use crossover::ma_crossover_signals;
pub use forecast::{ForecastCrossoverProvider, ForecastOrigin, PredictedPrices, PredictedSeries};
pub use position::{lagged_positions, position_actions, sma_position_signal};
pub use provider::{
    DecisionProvider, MaCrossoverProvider, PassThrough, PositionOutput, SmaPositionProvider,
};
pub use weights::{equal_weights, Rebalance};

use crate::domain::DecisionError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("invalid moving-average windows fast={fast} slow={slow} (need 1 <= fast < slow)")]
    InvalidWindows { fast: usize, slow: usize },

    #[error("cash buffer must lie in [0, 1], got {0}")]
    InvalidCashBuffer(f64),

    #[error("series for '{ticker}' has {got} values, expected {expected}")]
    LengthMismatch {
        ticker: String,
        got: usize,
        expected: usize,
    },

    #[error("forecast dates are not strictly increasing at {date}")]
    UnsortedDates { date: NaiveDate },

    #[error(transparent)]
    Decision(#[from] DecisionError),
}

pub(crate) fn validate_windows(fast: usize, slow: usize) -> Result<(), SignalError> {
    if fast >= 1 && fast < slow {
        Ok(())
    } else {
        Err(SignalError::InvalidWindows { fast, slow })
    }
}
