//! Moving-average crossover — buy while the fast mean is above the slow one.

use super::{validate_windows, SignalError};
use crate::domain::Signal;
use crate::indicators::Sma;

/// Classify every observation of `series` by comparing a fast and a slow SMA.
///
/// `buy` where fast > slow, `sell` where fast < slow, `hold` where they are
/// equal or either is undefined. The first `slow - 1` entries are therefore
/// always `hold`, as is any date whose slow window contains NaN.
pub fn ma_crossover_signals(
    series: &[f64],
    fast: usize,
    slow: usize,
) -> Result<Vec<Signal>, SignalError> {
    validate_windows(fast, slow)?;

    let fast_ma = Sma::new(fast).compute(series);
    let slow_ma = Sma::new(slow).compute(series);

    Ok(fast_ma
        .iter()
        .zip(&slow_ma)
        .map(|(&f, &s)| classify(f, s))
        .collect())
}

fn classify(fast: f64, slow: f64) -> Signal {
    if fast.is_nan() || slow.is_nan() {
        Signal::Hold
    } else if fast > slow {
        Signal::Buy
    } else if fast < slow {
        Signal::Sell
    } else {
        Signal::Hold
    }
}
