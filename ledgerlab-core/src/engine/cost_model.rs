//! Cost model — transaction cost and slippage applied to execution prices.
//!
//! Both frictions are fractional rates and combine additively. Buyers pay
//! more, sellers receive less. With zero total friction the raw price is
//! returned untouched, so frictionless runs see exact open prices.

use crate::config::SimConfig;
use crate::domain::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Transaction cost as a fraction of price (0.0001 = 1 bp).
    pub transaction_cost: f64,
    /// Slippage as a fraction of price.
    pub slippage: f64,
}

impl CostModel {
    pub fn new(transaction_cost: f64, slippage: f64) -> Self {
        Self {
            transaction_cost,
            slippage,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.transaction_cost_bps(), config.slippage_bps())
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn total_rate(&self) -> f64 {
        self.transaction_cost + self.slippage
    }

    /// Execution price for a raw open price on the given side.
    pub fn adjusted_price(&self, raw_price: f64, side: OrderSide) -> f64 {
        let total = self.total_rate();
        if total == 0.0 {
            return raw_price;
        }
        match side {
            OrderSide::Buy => raw_price * (1.0 + total),
            OrderSide::Sell => raw_price * (1.0 - total),
        }
    }
}
