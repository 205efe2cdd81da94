//! Position-and-lag signals.
//!
//! A raw in/out flag is computed from prices up to date `t`, shifted one
//! observation so the position is only held from `t + 1`, then diffed into
//! `buy`/`sell`/`hold` actions.

use super::{validate_windows, SignalError};
use crate::domain::Signal;
use crate::indicators::Sma;

/// Raw in/out flag: short SMA strictly above long SMA.
///
/// Both means use expanding warmup (`min_periods = 1`), so the flag is
/// defined from the first observation.
pub fn sma_position_signal(
    series: &[f64],
    short: usize,
    long: usize,
) -> Result<Vec<bool>, SignalError> {
    validate_windows(short, long)?;

    let short_ma = Sma::with_min_periods(short, 1).compute(series);
    let long_ma = Sma::with_min_periods(long, 1).compute(series);

    // NaN compares false: undefined means out.
    Ok(short_ma.iter().zip(&long_ma).map(|(s, l)| s > l).collect())
}

/// Shift a flag series one observation later; the first value is out.
pub fn lagged_positions(raw: &[bool]) -> Vec<bool> {
    let mut lagged = Vec::with_capacity(raw.len());
    if !raw.is_empty() {
        lagged.push(false);
        lagged.extend_from_slice(&raw[..raw.len() - 1]);
    }
    lagged
}

/// Diff consecutive positions: out→in `buy`, in→out `sell`, otherwise `hold`.
///
/// The position before the first observation is taken to be out.
pub fn position_actions(positions: &[bool]) -> Vec<Signal> {
    let mut previous = false;
    positions
        .iter()
        .map(|&held| {
            let action = match (previous, held) {
                (false, true) => Signal::Buy,
                (true, false) => Signal::Sell,
                _ => Signal::Hold,
            };
            previous = held;
            action
        })
        .collect()
}
