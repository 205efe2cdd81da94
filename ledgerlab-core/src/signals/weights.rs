//! Equal-weight allocation across positioned tickers.

use super::SignalError;
use crate::domain::{WeightRow, WeightTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How often the weight table changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rebalance {
    /// Recompute weights every date.
    #[default]
    Daily,
    /// Carry the previous row forward unless some position flag changed.
    OnSignal,
}

/// Build a weight table that splits `1 - cash_buffer` equally across the
/// tickers positioned on each date.
///
/// `positions` holds one flag column per ticker, aligned to `dates`. On a
/// date with no positioned ticker the whole portfolio goes to cash.
///
/// With [`Rebalance::OnSignal`] the first date is always computed fresh; a
/// later date with no position change since the previous date repeats the
/// previous row. Rows are then rescaled to sum to exactly 1.
pub fn equal_weights(
    dates: &[NaiveDate],
    tickers: &[String],
    positions: &[Vec<bool>],
    cash_buffer: f64,
    rebalance: Rebalance,
) -> Result<WeightTable, SignalError> {
    if !(0.0..=1.0).contains(&cash_buffer) {
        return Err(SignalError::InvalidCashBuffer(cash_buffer));
    }
    if positions.len() != tickers.len() {
        return Err(SignalError::LengthMismatch {
            ticker: "<positions>".into(),
            got: positions.len(),
            expected: tickers.len(),
        });
    }
    for (col, ticker) in positions.iter().zip(tickers) {
        if col.len() != dates.len() {
            return Err(SignalError::LengthMismatch {
                ticker: ticker.clone(),
                got: col.len(),
                expected: dates.len(),
            });
        }
    }

    let invested = 1.0 - cash_buffer;
    let mut rows: Vec<WeightRow> = Vec::with_capacity(dates.len());

    for t in 0..dates.len() {
        if rebalance == Rebalance::OnSignal && t > 0 {
            let changed = positions.iter().any(|col| col[t] != col[t - 1]);
            if !changed {
                let previous = rows[t - 1].clone();
                rows.push(previous);
                continue;
            }
        }

        let k = positions.iter().filter(|col| col[t]).count();
        let row = if k > 0 {
            let each = invested / k as f64;
            let weights = positions
                .iter()
                .map(|col| if col[t] { each } else { 0.0 })
                .collect();
            WeightRow::new(weights, cash_buffer)
        } else {
            WeightRow::new(vec![0.0; tickers.len()], 1.0)
        };
        rows.push(row);
    }

    if rebalance == Rebalance::OnSignal {
        for row in &mut rows {
            normalize(row);
        }
    }

    Ok(WeightTable::new(dates.to_vec(), tickers.to_vec(), rows)?)
}

fn normalize(row: &mut WeightRow) {
    let total = row.total();
    if total > 0.0 {
        for w in &mut row.weights {
            *w /= total;
        }
        row.cash /= total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        (0..n as u64).map(|i| start + chrono::Days::new(i)).collect()
    }

    fn tickers() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }

    #[test]
    fn splits_invested_fraction_equally() {
        let positions = vec![vec![true, true, false], vec![false, true, false]];
        let table = equal_weights(&dates(3), &tickers(), &positions, 0.2, Rebalance::Daily).unwrap();
        let rows = table.rows();

        assert!((rows[0].weights[0] - 0.8).abs() < 1e-12);
        assert_eq!(rows[0].weights[1], 0.0);
        assert!((rows[0].cash - 0.2).abs() < 1e-12);

        assert!((rows[1].weights[0] - 0.4).abs() < 1e-12);
        assert!((rows[1].weights[1] - 0.4).abs() < 1e-12);

        // Nothing positioned: all cash.
        assert_eq!(rows[2].weights, vec![0.0, 0.0]);
        assert_eq!(rows[2].cash, 1.0);
    }

    #[test]
    fn every_row_sums_to_one() {
        let positions = vec![vec![true, false, true, true], vec![true, true, false, true]];
        let table = equal_weights(&dates(4), &tickers(), &positions, 0.1, Rebalance::Daily).unwrap();
        for row in table.rows() {
            assert!((row.total() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn on_signal_carries_rows_forward() {
        let positions = vec![vec![false, true, true, true], vec![false, false, false, true]];
        let table =
            equal_weights(&dates(4), &tickers(), &positions, 0.0, Rebalance::OnSignal).unwrap();
        let rows = table.rows();

        assert_eq!(rows[0].cash, 1.0);
        assert!((rows[1].weights[0] - 1.0).abs() < 1e-12);
        assert_eq!(rows[2], rows[1]);
        assert!((rows[3].weights[0] - 0.5).abs() < 1e-12);
        assert!((rows[3].weights[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_cash_buffer_out_of_range() {
        let positions = vec![vec![true], vec![true]];
        for bad in [-0.1, 1.5, f64::NAN] {
            let err = equal_weights(&dates(1), &tickers(), &positions, bad, Rebalance::Daily)
                .unwrap_err();
            assert!(matches!(err, SignalError::InvalidCashBuffer(_)));
        }
    }

    #[test]
    fn rejects_ragged_positions() {
        let positions = vec![vec![true, false], vec![true]];
        let err =
            equal_weights(&dates(2), &tickers(), &positions, 0.2, Rebalance::Daily).unwrap_err();
        assert!(matches!(err, SignalError::LengthMismatch { ref ticker, .. } if ticker == "B"));
    }
}
