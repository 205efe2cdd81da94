use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

/// Fill record: one executed trade at the next session's open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Date whose decision produced the trade.
    pub decision_date: NaiveDate,
    /// Date whose open price the trade executed at.
    pub execution_date: NaiveDate,
    pub ticker: String,
    pub side: OrderSide,
    /// Always positive; direction is carried by `side`.
    pub quantity: i64,
    /// Open price before frictions.
    pub raw_price: f64,
    /// Cost-adjusted price actually paid or received.
    pub price: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    /// Money lost to cost and slippage on this fill.
    pub fn friction(&self) -> f64 {
        (self.price - self.raw_price).abs() * self.quantity as f64
    }

    /// Signed share change: positive for buys.
    pub fn signed_quantity(&self) -> i64 {
        match self.side {
            OrderSide::Buy => self.quantity,
            OrderSide::Sell => -self.quantity,
        }
    }
}
