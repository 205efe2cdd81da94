//! Signal-mode allocation: all-in buys, full liquidation on sell.

use super::{round_to_lot, Allocator, Step, TradeDelta};
use crate::engine::cost_model::CostModel;
use crate::engine::state::Book;
use crate::engine::SimError;
use crate::domain::{OrderSide, Signal, SignalTable};

/// Executes `buy`/`sell`/`hold` decisions in config ticker order against a
/// running cash balance.
///
/// - `buy` spends as much of the running cash as buys whole lots at the
///   buy-adjusted open. Sizing uses the adjusted price, so cash never goes
///   negative.
/// - `sell` liquidates the entire position at the sell-adjusted open; with no
///   shares held it is a no-op.
/// - `hold` does nothing.
#[derive(Debug, Clone)]
pub struct SignalAllocator<'a> {
    table: &'a SignalTable,
    /// Decision-table column for each config ticker.
    columns: Vec<usize>,
    cost: CostModel,
    lot_size: i64,
}

impl<'a> SignalAllocator<'a> {
    pub fn new(table: &'a SignalTable, columns: Vec<usize>, cost: CostModel, lot_size: u32) -> Self {
        Self {
            table,
            columns,
            cost,
            lot_size: i64::from(lot_size.max(1)),
        }
    }

    /// Whole lots purchasable with `cash` at `price`.
    fn affordable(&self, cash: f64, price: f64) -> i64 {
        if cash < price {
            return 0;
        }
        let mut shares = round_to_lot((cash / price).floor() as i64, self.lot_size);
        while shares > 0 && shares as f64 * price > cash {
            shares -= self.lot_size;
        }
        shares
    }
}

impl Allocator for SignalAllocator<'_> {
    fn name(&self) -> &str {
        "signals"
    }

    fn execute(&self, step: &Step<'_>, book: &Book) -> Result<TradeDelta, SimError> {
        let mut delta = TradeDelta::none(step.ticker_count());
        let Some(row) = step.decision_row else {
            return Ok(delta);
        };
        let signals = &self.table.rows()[row];

        for (i, &col) in self.columns.iter().enumerate() {
            match signals[col] {
                Signal::Hold => {}
                Signal::Buy => {
                    let raw = step.next_open(i)?;
                    let price = self.cost.adjusted_price(raw, OrderSide::Buy);
                    let cash = book.cash() + delta.cash_delta;
                    let quantity = self.affordable(cash, price);
                    if quantity > 0 {
                        delta.record(i, step.fill(i, OrderSide::Buy, quantity, raw, price));
                    }
                }
                Signal::Sell => {
                    let held = book.shares()[i] + delta.position_deltas[i];
                    if held <= 0 {
                        continue;
                    }
                    let raw = step.next_open(i)?;
                    let price = self.cost.adjusted_price(raw, OrderSide::Sell);
                    delta.record(i, step.fill(i, OrderSide::Sell, held, raw, price));
                }
            }
        }

        debug_assert!(
            book.cash() + delta.cash_delta >= -1e-9 * book.cash().abs().max(1.0),
            "signal-mode cash went negative on {}",
            step.date
        );
        Ok(delta)
    }
}
