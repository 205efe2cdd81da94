//! Performance metrics — pure functions over a portfolio value series.
//!
//! Every metric takes the ledger's `total_value` column and returns a scalar.
//! Degenerate input (too short, zero variance, never below its peak) yields
//! 0.0 rather than NaN.

use serde::{Deserialize, Serialize};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Added to the return volatility before dividing.
const SHARPE_EPSILON: f64 = 1e-12;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub final_value: f64,
    pub observations: usize,
}

impl PerformanceMetrics {
    pub fn compute(values: &[f64]) -> Self {
        Self {
            total_return: total_return(values),
            annualized_return: annualized_return(values),
            sharpe: sharpe_ratio(values),
            max_drawdown: max_drawdown(values),
            final_value: values.last().copied().unwrap_or(0.0),
            observations: values.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `V[last] / V[0] - 1`; 0.0 for fewer than two values or a non-positive start.
pub fn total_return(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() > 1 && first > 0.0 => last / first - 1.0,
        _ => 0.0,
    }
}

/// Geometric annualization of the total return over `len` observations.
///
/// `(1 + total_return)^(252 / len) - 1`. A run that lost everything (or
/// more, with shorts) annualizes to -1.0.
pub fn annualized_return(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let growth = 1.0 + total_return(values);
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(TRADING_DAYS_PER_YEAR / values.len() as f64) - 1.0
}

/// Annualized Sharpe ratio of daily returns (zero risk-free rate).
///
/// `mean / (sample_std + 1e-12) * sqrt(252)`; 0.0 with fewer than two returns.
pub fn sharpe_ratio(values: &[f64]) -> f64 {
    let returns = daily_returns(values);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = sample_std(&returns);
    mean / (std + SHARPE_EPSILON) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Deepest fall from a running peak, as a non-positive fraction
/// (-0.15 is a 15% drawdown).
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            worst = worst.min(v / peak - 1.0);
        }
    }
    worst
}

/// Simple returns `V[i] / V[i-1] - 1`. Steps from a non-positive value are
/// undefined and left out.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

fn mean_f64(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Standard deviation with Bessel's correction.
fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(xs);
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}
