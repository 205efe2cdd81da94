//! Price loading for the runner.
//!
//! Three sources, chosen by the `[data]` section:
//! 1. Wide CSV pair: `open.csv` and `close.csv`, date column then one column
//!    per ticker. Both files must cover the same dates and tickers.
//! 2. Long CSV: `date,ticker,open,close` rows, aligned to the union of dates.
//! 3. Synthetic: a deterministic random walk per ticker (tagged).
//!
//! Empty cells are NaN, never zero. Every load carries a BLAKE3 hash of the
//! resulting frame for run manifests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use ledgerlab_core::data::{align_tickers, DailyBar};
use ledgerlab_core::domain::{FrameError, PriceTable};
use ledgerlab_core::{DecisionError, PriceFrame};
use ledgerlab_core::signals::SignalError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DataSection;

/// Errors from loading prices, decision tables or predictions.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no data rows")]
    Empty { path: PathBuf },

    #[error("{path} is missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}, row {row}: cannot parse date '{value}'")]
    BadDate {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("{path}, row {row}, column '{column}': cannot parse '{value}'")]
    BadValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("open and close files disagree: {0}")]
    Misaligned(String),

    #[error("synthetic range {start}..={end} has no business days")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Frame(FrameError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

impl From<FrameError> for LoadError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Misaligned(msg) => LoadError::Misaligned(msg),
            other => LoadError::Frame(other),
        }
    }
}

/// Where a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    WideCsv,
    LongCsv,
    Synthetic,
}

/// Loaded prices plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub frame: PriceFrame,
    pub source: DataSource,
    /// BLAKE3 over tickers, dates and every price.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn new(frame: PriceFrame, source: DataSource) -> Self {
        let dataset_hash = dataset_hash(&frame);
        Self {
            frame,
            source,
            dataset_hash,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Load prices as described by a `[data]` section.
pub fn load_prices(section: &DataSection) -> Result<LoadedData, LoadError> {
    let loaded = match section {
        DataSection::WideCsv { open, close } => {
            LoadedData::new(load_wide_csv(open, close)?, DataSource::WideCsv)
        }
        DataSection::LongCsv { path } => LoadedData::new(load_long_csv(path)?, DataSource::LongCsv),
        DataSection::Synthetic {
            tickers,
            start,
            end,
        } => {
            warn!("generating synthetic prices; results will be tagged as synthetic");
            LoadedData::new(
                generate_synthetic(tickers, *start, *end)?,
                DataSource::Synthetic,
            )
        }
    };

    for (ticker, missing) in loaded.frame.missing_counts() {
        if missing > 0 {
            warn!(%ticker, missing, "ticker has missing prices");
        }
    }
    info!(
        source = ?loaded.source,
        tickers = loaded.frame.tickers().len(),
        dates = loaded.frame.len(),
        hash = %loaded.dataset_hash,
        "prices loaded"
    );
    Ok(loaded)
}

// ─── Wide CSV ───────────────────────────────────────────────────────

/// Read an open file and a close file into one frame.
pub fn load_wide_csv(open: &Path, close: &Path) -> Result<PriceFrame, LoadError> {
    let open_table = read_wide_prices(open)?;
    let close_table = read_wide_prices(close)?;
    Ok(PriceFrame::from_tables(open_table, close_table)?)
}

/// Read one wide price file: first column a date, then one column per ticker.
pub fn read_wide_prices(path: &Path) -> Result<PriceTable, LoadError> {
    let (tickers, rows) = read_wide(path)?;
    let mut columns = vec![Vec::with_capacity(rows.len()); tickers.len()];
    let mut dates = Vec::with_capacity(rows.len());

    for (row_idx, (date, cells)) in rows.into_iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            columns[col].push(parse_price(cell).ok_or_else(|| LoadError::BadValue {
                path: path.to_path_buf(),
                row: row_idx + 1,
                column: tickers[col].clone(),
                value: cell.clone(),
            })?);
        }
        dates.push(date);
    }

    Ok(PriceTable {
        dates,
        tickers,
        columns,
    })
}

/// Header (minus the date column) and `(date, cells)` per data row.
pub(crate) type WideRows = (Vec<String>, Vec<(NaiveDate, Vec<String>)>);

/// Shared wide-layout reader for prices, decisions and predictions.
pub(crate) fn read_wide(path: &Path) -> Result<WideRows, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let header: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let raw_date = record.get(0).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| LoadError::BadDate {
            path: path.to_path_buf(),
            row: row_idx + 1,
            value: raw_date.to_string(),
        })?;
        let cells: Vec<String> = (1..=header.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        rows.push((date, cells));
    }

    if rows.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok((header, rows))
}

/// `YYYY-MM-DD`, optionally followed by a time part that is ignored.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split(|c: char| c == ' ' || c == 'T').next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Empty cells (and the usual NaN spellings) become NaN.
pub(crate) fn parse_price(cell: &str) -> Option<f64> {
    match cell {
        "" | "NaN" | "nan" | "NA" => Some(f64::NAN),
        s => s.parse().ok(),
    }
}

// ─── Long CSV ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LongRow {
    date: String,
    ticker: String,
    open: Option<f64>,
    close: Option<f64>,
}

/// Read `date,ticker,open,close` rows and align tickers on the union of dates.
pub fn load_long_csv(path: &Path) -> Result<PriceFrame, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    for column in ["date", "ticker", "open", "close"] {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut bars: BTreeMap<String, Vec<DailyBar>> = BTreeMap::new();
    for (row_idx, row) in reader.deserialize::<LongRow>().enumerate() {
        let row = row.map_err(csv_err)?;
        let date = parse_date(&row.date).ok_or_else(|| LoadError::BadDate {
            path: path.to_path_buf(),
            row: row_idx + 1,
            value: row.date.clone(),
        })?;
        bars.entry(row.ticker).or_default().push(DailyBar::new(
            date,
            row.open.unwrap_or(f64::NAN),
            row.close.unwrap_or(f64::NAN),
        ));
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(align_tickers(bars)?)
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Deterministic random-walk prices on weekdays in `start..=end`.
///
/// Each ticker's walk is seeded from the BLAKE3 hash of its name, so the same
/// ticker always gets the same path.
pub fn generate_synthetic(
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceFrame, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let dates: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();
    if dates.is_empty() {
        return Err(LoadError::EmptyRange { start, end });
    }

    let mut open = Vec::with_capacity(tickers.len());
    let mut close = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let seed: [u8; 32] = *blake3::hash(ticker.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut price = 100.0_f64;
        let mut o = Vec::with_capacity(dates.len());
        let mut c = Vec::with_capacity(dates.len());
        for _ in &dates {
            let gap: f64 = rng.gen_range(-0.005..0.005);
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let day_open = price * (1.0 + gap);
            let day_close = day_open * (1.0 + daily_return);
            o.push(day_open);
            c.push(day_close);
            price = day_close;
        }
        open.push(o);
        close.push(c);
    }

    Ok(PriceFrame::new(dates, tickers.to_vec(), open, close)?)
}

// ─── Hashing ────────────────────────────────────────────────────────

/// Deterministic BLAKE3 hash over tickers, dates and every open/close value.
pub fn dataset_hash(frame: &PriceFrame) -> String {
    let mut hasher = blake3::Hasher::new();
    for ticker in frame.tickers() {
        hasher.update(ticker.as_bytes());
        hasher.update(&[0]);
    }
    for date in frame.dates() {
        hasher.update(date.to_string().as_bytes());
    }
    for ticker in frame.tickers() {
        for series in [frame.open_series(ticker), frame.close_series(ticker)]
            .into_iter()
            .flatten()
        {
            for v in series {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parse_date_ignores_time_suffix() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(parse_date("2024-01-02"), Some(d));
        assert_eq!(parse_date("2024-01-02 00:00:00"), Some(d));
        assert_eq!(parse_date("2024-01-02T00:00:00+00:00"), Some(d));
        assert_eq!(parse_date("01/02/2024"), None);
    }

    #[test]
    fn parse_price_maps_empty_to_nan() {
        assert!(parse_price("").unwrap().is_nan());
        assert_eq!(parse_price("101.5"), Some(101.5));
        assert_eq!(parse_price("abc"), None);
    }

    #[test]
    fn wide_pair_loads_into_frame() {
        let dir = tempfile::tempdir().unwrap();
        let open = write_file(
            dir.path(),
            "open.csv",
            "Date,AAA,BBB\n2024-01-02,10,20\n2024-01-03,11,\n",
        );
        let close = write_file(
            dir.path(),
            "close.csv",
            "Date,BBB,AAA\n2024-01-02,21,10.5\n2024-01-03,22,11.5\n",
        );

        let frame = load_wide_csv(&open, &close).unwrap();
        assert_eq!(frame.tickers(), ["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.close(0, 0), 10.5);
        assert_eq!(frame.close(1, 1), 22.0);
        assert!(frame.open(1, 1).is_nan());
    }

    #[test]
    fn wide_pair_with_different_dates_is_misaligned() {
        let dir = tempfile::tempdir().unwrap();
        let open = write_file(dir.path(), "open.csv", "Date,AAA\n2024-01-02,10\n");
        let close = write_file(dir.path(), "close.csv", "Date,AAA\n2024-01-03,10\n");
        assert!(matches!(
            load_wide_csv(&open, &close),
            Err(LoadError::Misaligned(_))
        ));
    }

    #[test]
    fn wide_bad_cell_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "open.csv", "Date,AAA\n2024-01-02,ten\n");
        match read_wide_prices(&path) {
            Err(LoadError::BadValue {
                row, column, value, ..
            }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "AAA");
                assert_eq!(value, "ten");
            }
            other => panic!("expected BadValue, got {other:?}"),
        }
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "open.csv", "Date,AAA\n");
        assert!(matches!(
            read_wide_prices(&path),
            Err(LoadError::Empty { .. })
        ));
    }

    #[test]
    fn long_csv_aligns_union_of_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "prices.csv",
            "date,ticker,open,close\n\
             2024-01-02,SPY,100,101\n\
             2024-01-03,SPY,101,102\n\
             2024-01-02,QQQ,200,202\n",
        );
        let frame = load_long_csv(&path).unwrap();
        assert_eq!(frame.tickers(), ["QQQ".to_string(), "SPY".to_string()]);
        assert_eq!(frame.len(), 2);
        assert!(frame.close(1, 0).is_nan());
        assert_eq!(frame.close(1, 1), 102.0);
    }

    #[test]
    fn long_csv_requires_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "prices.csv", "date,ticker,close\n");
        match load_long_csv(&path) {
            Err(LoadError::MissingColumn { column, .. }) => assert_eq!(column, "open"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn synthetic_skips_weekends_and_is_deterministic() {
        let tickers = vec!["SPY".to_string(), "QQQ".to_string()];
        // 2024-01-01 is a Monday.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();

        let a = generate_synthetic(&tickers, start, end).unwrap();
        let b = generate_synthetic(&tickers, start, end).unwrap();
        assert_eq!(a.len(), 10);
        assert!(a
            .dates()
            .iter()
            .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert_eq!(a.close_series("SPY"), b.close_series("SPY"));
        assert_ne!(a.close(0, 0), a.close(0, 1));
        assert!(a.close_series("SPY").unwrap().iter().all(|p| *p > 0.0));
    }

    #[test]
    fn synthetic_weekend_only_range_fails() {
        let sat = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let sun = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert!(matches!(
            generate_synthetic(&["X".to_string()], sat, sun),
            Err(LoadError::EmptyRange { .. })
        ));
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let a = generate_synthetic(&["SPY".to_string()], start, end).unwrap();
        let b = generate_synthetic(&["SPY".to_string()], start, end).unwrap();
        let c = generate_synthetic(&["QQQ".to_string()], start, end).unwrap();
        assert_eq!(dataset_hash(&a), dataset_hash(&b));
        assert_ne!(dataset_hash(&a), dataset_hash(&c));
    }

    #[test]
    fn load_prices_tags_synthetic() {
        let section = DataSection::Synthetic {
            tickers: vec!["FAKE".into()],
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        };
        let loaded = load_prices(&section).unwrap();
        assert!(loaded.is_synthetic());
        assert_eq!(loaded.dataset_hash, dataset_hash(&loaded.frame));
    }
}
