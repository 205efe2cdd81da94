//! Simple Moving Average (SMA).
//!
//! Rolling mean of a price series over a lookback window.
//! With the default `min_periods == period`, the first valid value is at
//! index `period - 1` and any window containing NaN is NaN. A smaller
//! `min_periods` averages whatever finite observations the window holds once
//! there are at least that many (expanding warmup).

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    min_periods: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self::with_min_periods(period, period)
    }

    pub fn with_min_periods(period: usize, min_periods: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        assert!(
            (1..=period).contains(&min_periods),
            "SMA min_periods must be in 1..=period"
        );
        Self {
            period,
            min_periods,
            name: format!("sma_{period}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Index of the first value that can be defined.
    pub fn lookback(&self) -> usize {
        self.min_periods.saturating_sub(1)
    }

    pub fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];

        let mut sum = 0.0;
        let mut valid = 0usize;

        for i in 0..n {
            let entering = values[i];
            if entering.is_finite() {
                sum += entering;
                valid += 1;
            }
            if i >= self.period {
                let leaving = values[i - self.period];
                if leaving.is_finite() {
                    sum -= leaving;
                    valid -= 1;
                }
            }
            if valid == 0 {
                // Drop accumulated rounding residue.
                sum = 0.0;
                continue;
            }
            if valid >= self.min_periods {
                result[i] = sum / valid as f64;
            }
        }

        result
    }
}
