//! Reading externally produced decision tables and predicted prices.
//!
//! Decision files use the wide layout: a date column, then one column per
//! ticker. Weight files must also carry a `CASH` column; every other column
//! is a ticker. Prediction files hold `<T>_pred` columns (other columns such
//! as `<T>_actual` are ignored).

use std::path::Path;

use ledgerlab_core::domain::CASH_COLUMN;
use ledgerlab_core::signals::{ForecastOrigin, PredictedPrices, PredictedSeries};
use ledgerlab_core::{DecisionTable, Mode, Signal, SignalTable, WeightRow, WeightTable};
use tracing::debug;

use crate::data_loader::{parse_price, read_wide, LoadError};

const PRED_SUFFIX: &str = "_pred";

/// Read a decision table in the layout of the given mode.
pub fn read_decisions(path: &Path, mode: Mode) -> Result<DecisionTable, LoadError> {
    let table = match mode {
        Mode::Signals => read_signals_csv(path)?.into(),
        Mode::Weights => read_weights_csv(path)?.into(),
    };
    Ok(table)
}

/// Signal cells are `buy`/`sell`/`hold` in any case; an empty cell holds.
pub fn read_signals_csv(path: &Path) -> Result<SignalTable, LoadError> {
    let (header, rows) = read_wide(path)?;
    let keep: Vec<usize> = (0..header.len())
        .filter(|&i| header[i] != CASH_COLUMN)
        .collect();
    let tickers: Vec<String> = keep.iter().map(|&i| header[i].clone()).collect();

    let mut dates = Vec::with_capacity(rows.len());
    let mut signals = Vec::with_capacity(rows.len());
    for (date, cells) in rows {
        let row = keep
            .iter()
            .map(|&i| match cells[i].as_str() {
                "" => Ok(Signal::Hold),
                s => s.parse::<Signal>(),
            })
            .collect::<Result<Vec<_>, _>>()?;
        dates.push(date);
        signals.push(row);
    }

    debug!(path = %path.display(), rows = dates.len(), tickers = tickers.len(), "signals read");
    Ok(SignalTable::new(dates, tickers, signals)?)
}

/// Weight cells are fractions; an empty cell is NaN and is rejected by the
/// simulator if that ticker is traded.
pub fn read_weights_csv(path: &Path) -> Result<WeightTable, LoadError> {
    let (header, rows) = read_wide(path)?;
    let cash_idx = header
        .iter()
        .position(|h| h == CASH_COLUMN)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: CASH_COLUMN.to_string(),
        })?;
    let keep: Vec<usize> = (0..header.len()).filter(|&i| i != cash_idx).collect();
    let tickers: Vec<String> = keep.iter().map(|&i| header[i].clone()).collect();

    let parse = |row: usize, col: usize, cell: &str| {
        parse_price(cell).ok_or_else(|| LoadError::BadValue {
            path: path.to_path_buf(),
            row,
            column: header[col].clone(),
            value: cell.to_string(),
        })
    };

    let mut dates = Vec::with_capacity(rows.len());
    let mut weight_rows = Vec::with_capacity(rows.len());
    for (row_idx, (date, cells)) in rows.iter().enumerate() {
        let weights = keep
            .iter()
            .map(|&i| parse(row_idx + 1, i, &cells[i]))
            .collect::<Result<Vec<_>, _>>()?;
        let cash = parse(row_idx + 1, cash_idx, &cells[cash_idx])?;
        dates.push(*date);
        weight_rows.push(WeightRow::new(weights, cash));
    }

    debug!(path = %path.display(), rows = dates.len(), tickers = tickers.len(), "weights read");
    Ok(WeightTable::new(dates, tickers, weight_rows)?)
}

/// Read `<T>_pred` columns as predicted closes tagged with the file name.
pub fn read_predictions_csv(path: &Path) -> Result<PredictedPrices, LoadError> {
    let (header, rows) = read_wide(path)?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let dates = rows.iter().map(|(d, _)| *d).collect();
    let mut predictions = PredictedPrices::new(dates)?;

    for (col, name) in header.iter().enumerate() {
        let Some(ticker) = name.strip_suffix(PRED_SUFFIX) else {
            continue;
        };
        let values = rows
            .iter()
            .enumerate()
            .map(|(row_idx, (_, cells))| {
                parse_price(&cells[col]).ok_or_else(|| LoadError::BadValue {
                    path: path.to_path_buf(),
                    row: row_idx + 1,
                    column: name.clone(),
                    value: cells[col].clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        predictions.insert(
            ticker,
            PredictedSeries {
                values,
                origin: ForecastOrigin::Imported {
                    source: source.clone(),
                },
            },
        )?;
    }

    if predictions.tickers().next().is_none() {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: format!("<ticker>{PRED_SUFFIX}"),
        });
    }
    Ok(predictions)
}
