//! Domain types for LedgerLab

pub mod decision;
pub mod fill;
pub mod frame;
pub mod ledger;

pub use decision::{
    DecisionError, DecisionTable, Mode, Signal, SignalTable, WeightRow, WeightTable, CASH_COLUMN,
};
pub use fill::{Fill, OrderSide};
pub use frame::{FrameError, PriceField, PriceFrame, PriceTable};
pub use ledger::{Ledger, LedgerRow};
