//! Indicators over plain `f64` price series.
//!
//! Series are computed in one pass before any decision is made. Undefined
//! values are NaN; callers decide what NaN means for them.

pub mod sma;

pub use sma::Sma;

/// Default comparison tolerance for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() < eps,
        "expected {expected}, got {actual} (eps {eps})"
    );
}
