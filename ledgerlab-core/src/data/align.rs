//! Multi-ticker time alignment.
//!
//! Given open/close bars for several tickers, align them to the union of
//! their dates. Missing bars become strict NaN (no forward-fill of tradable
//! price data).

use crate::domain::{FrameError, PriceFrame};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One observed open/close pair for a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

impl DailyBar {
    pub fn new(date: NaiveDate, open: f64, close: f64) -> Self {
        Self { date, open, close }
    }
}

/// Align several tickers to a common timeline and build a [`PriceFrame`].
///
/// Tickers come out in sorted order. For a ticker with two bars on the same
/// date the later one wins.
pub fn align_tickers(ticker_bars: BTreeMap<String, Vec<DailyBar>>) -> Result<PriceFrame, FrameError> {
    let dates: Vec<NaiveDate> = ticker_bars
        .values()
        .flatten()
        .map(|b| b.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut tickers = Vec::with_capacity(ticker_bars.len());
    let mut open = Vec::with_capacity(ticker_bars.len());
    let mut close = Vec::with_capacity(ticker_bars.len());

    for (ticker, bars) in &ticker_bars {
        let by_date: HashMap<NaiveDate, &DailyBar> = bars.iter().map(|b| (b.date, b)).collect();

        let (o, c): (Vec<f64>, Vec<f64>) = dates
            .iter()
            .map(|d| match by_date.get(d) {
                Some(b) => (b.open, b.close),
                None => (f64::NAN, f64::NAN),
            })
            .unzip();

        tickers.push(ticker.clone());
        open.push(o);
        close.push(c);
    }

    PriceFrame::new(dates, tickers, open, close)
}
