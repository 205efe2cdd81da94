//! Price data alignment

pub mod align;

pub use align::{align_tickers, DailyBar};
