//! Decision providers — one interface over every way of producing a table.

use super::{
    equal_weights, lagged_positions, ma_crossover_signals, position_actions, sma_position_signal,
    validate_windows, Rebalance, SignalError,
};
use crate::domain::{DecisionTable, PriceFrame, SignalTable};
use serde::{Deserialize, Serialize};

/// Produces a decision table from a price frame.
///
/// Providers see prices only; they cannot observe the simulator's book.
pub trait DecisionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn decisions(&self, prices: &PriceFrame) -> Result<DecisionTable, SignalError>;
}

/// Fast/slow SMA crossover on each ticker's observed closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaCrossoverProvider {
    pub fast: usize,
    pub slow: usize,
}

impl MaCrossoverProvider {
    pub fn new(fast: usize, slow: usize) -> Result<Self, SignalError> {
        validate_windows(fast, slow)?;
        Ok(Self { fast, slow })
    }
}

impl Default for MaCrossoverProvider {
    fn default() -> Self {
        Self { fast: 10, slow: 30 }
    }
}

impl DecisionProvider for MaCrossoverProvider {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn decisions(&self, prices: &PriceFrame) -> Result<DecisionTable, SignalError> {
        let columns = prices
            .tickers()
            .iter()
            .map(|t| {
                let closes = prices.close_series(t).unwrap_or(&[]);
                ma_crossover_signals(closes, self.fast, self.slow)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let table = SignalTable::from_columns(
            prices.dates().to_vec(),
            prices.tickers().to_vec(),
            columns,
        )?;
        Ok(table.into())
    }
}

/// What a [`SmaPositionProvider`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionOutput {
    /// Buy/sell on position changes.
    Signals,
    /// Equal weights across positioned tickers.
    Weights {
        cash_buffer: f64,
        rebalance: Rebalance,
    },
}

/// Lagged SMA position strategy: in while the short mean is above the long
/// one, entering the day after the flag turns on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmaPositionProvider {
    pub short: usize,
    pub long: usize,
    pub output: PositionOutput,
}

impl SmaPositionProvider {
    pub fn new(short: usize, long: usize, output: PositionOutput) -> Result<Self, SignalError> {
        validate_windows(short, long)?;
        if let PositionOutput::Weights { cash_buffer, .. } = output {
            if !(0.0..=1.0).contains(&cash_buffer) {
                return Err(SignalError::InvalidCashBuffer(cash_buffer));
            }
        }
        Ok(Self {
            short,
            long,
            output,
        })
    }

    /// Lagged position flag per ticker, in frame ticker order.
    pub fn positions(&self, prices: &PriceFrame) -> Result<Vec<Vec<bool>>, SignalError> {
        prices
            .tickers()
            .iter()
            .map(|t| {
                let closes = prices.close_series(t).unwrap_or(&[]);
                sma_position_signal(closes, self.short, self.long).map(|raw| lagged_positions(&raw))
            })
            .collect()
    }
}

impl Default for SmaPositionProvider {
    fn default() -> Self {
        Self {
            short: 20,
            long: 50,
            output: PositionOutput::Signals,
        }
    }
}

impl DecisionProvider for SmaPositionProvider {
    fn name(&self) -> &str {
        match self.output {
            PositionOutput::Signals => "sma_position",
            PositionOutput::Weights { .. } => "sma_equal_weight",
        }
    }

    fn decisions(&self, prices: &PriceFrame) -> Result<DecisionTable, SignalError> {
        let positions = self.positions(prices)?;
        let dates = prices.dates().to_vec();
        let tickers = prices.tickers().to_vec();

        match self.output {
            PositionOutput::Signals => {
                let columns = positions.iter().map(|p| position_actions(p)).collect();
                Ok(SignalTable::from_columns(dates, tickers, columns)?.into())
            }
            PositionOutput::Weights {
                cash_buffer,
                rebalance,
            } => Ok(equal_weights(&dates, &tickers, &positions, cash_buffer, rebalance)?.into()),
        }
    }
}

/// Hands back a table produced elsewhere, e.g. read from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct PassThrough(pub DecisionTable);

impl DecisionProvider for PassThrough {
    fn name(&self) -> &str {
        "pass_through"
    }

    fn decisions(&self, _prices: &PriceFrame) -> Result<DecisionTable, SignalError> {
        Ok(self.0.clone())
    }
}
