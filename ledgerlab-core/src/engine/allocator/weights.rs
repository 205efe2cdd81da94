//! Weight-mode allocation: rebalance every ticker toward a target fraction.

use super::{round_to_lot, Allocator, Step, TradeDelta};
use crate::domain::{OrderSide, WeightTable};
use crate::engine::cost_model::CostModel;
use crate::engine::state::Book;
use crate::engine::SimError;
use tracing::warn;

/// Rows whose fractions (cash included) miss 1.0 by more than this are logged.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Differences below this fraction of portfolio value are treated as zero,
/// so floating-point residue never turns into a one-share trade.
const DUST_FRACTION: f64 = 1e-9;

/// Rebalances each ticker to `portfolio_value × weight`.
///
/// Portfolio value is snapshotted once per date (cash plus holdings at the
/// close), so every ticker's target comes from the same number. Orders are
/// sized with `floor(diff / adjusted_price)`, then truncated toward zero to
/// whole lots. Sales are capped at the current holding unless shorting is
/// allowed.
#[derive(Debug, Clone)]
pub struct WeightAllocator<'a> {
    table: &'a WeightTable,
    /// Decision-table column for each config ticker.
    columns: Vec<usize>,
    cost: CostModel,
    lot_size: i64,
    allow_short: bool,
}

impl<'a> WeightAllocator<'a> {
    pub fn new(
        table: &'a WeightTable,
        columns: Vec<usize>,
        cost: CostModel,
        lot_size: u32,
        allow_short: bool,
    ) -> Self {
        Self {
            table,
            columns,
            cost,
            lot_size: i64::from(lot_size.max(1)),
            allow_short,
        }
    }
}

impl Allocator for WeightAllocator<'_> {
    fn name(&self) -> &str {
        "weights"
    }

    fn execute(&self, step: &Step<'_>, book: &Book) -> Result<TradeDelta, SimError> {
        let n = step.ticker_count();
        let mut delta = TradeDelta::none(n);
        let Some(row) = step.decision_row else {
            return Ok(delta);
        };
        let targets = &self.table.rows()[row];

        let total = targets.total();
        if !((total - 1.0).abs() <= WEIGHT_SUM_TOLERANCE) {
            warn!(date = %step.date, total, "weight row does not sum to 1");
        }

        // Snapshot before any trade.
        let mut current = vec![0.0; n];
        for (i, &held) in book.shares().iter().enumerate() {
            if held != 0 {
                current[i] = held as f64 * step.close(i)?;
            }
        }
        let portfolio_value = book.cash() + current.iter().sum::<f64>();
        let dust = DUST_FRACTION * portfolio_value.abs();

        for (i, &col) in self.columns.iter().enumerate() {
            let weight = targets.weights[col];
            if !weight.is_finite() || (weight < 0.0 && !self.allow_short) {
                return Err(SimError::InvalidWeight {
                    date: step.date,
                    ticker: step.ticker(i).to_string(),
                    value: weight,
                });
            }

            let diff = portfolio_value * weight - current[i];
            if diff.abs() <= dust {
                continue;
            }

            let side = if diff > 0.0 {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            let raw = step.next_open(i)?;
            let price = self.cost.adjusted_price(raw, side);

            let mut shares = round_to_lot((diff / price).floor() as i64, self.lot_size);
            if !self.allow_short {
                shares = shares.max(-book.shares()[i]);
            }
            if shares == 0 {
                continue;
            }

            delta.record(i, step.fill(i, side, shares.abs(), raw, price));
        }

        Ok(delta)
    }
}
