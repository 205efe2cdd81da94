//! Portfolio simulation engine.
//!
//! Consumes a [`PriceFrame`](crate::domain::PriceFrame), a
//! [`DecisionTable`](crate::domain::DecisionTable) and a
//! [`SimConfig`](crate::config::SimConfig), and walks the date index once:
//!
//! 1. Look up the decision row for the date (or apply the missing-row policy)
//! 2. Let the mode's allocator size trades at the next date's open
//! 3. Apply the trades to the book
//! 4. Value the book at the current close and append a ledger row

pub mod allocator;
pub mod cost_model;
pub mod simulator;
pub mod state;

pub use allocator::{Allocator, SignalAllocator, Step, TradeDelta, WeightAllocator};
pub use cost_model::CostModel;
pub use simulator::{run_backtest, SimError, Simulator};
pub use state::Book;
