//! Date-by-date portfolio simulation.
//!
//! For every date `t` except the last, decisions dated `t` execute at the
//! open of `t + 1` and the book is valued at the close of `t` with the
//! post-trade shares. Execution always uses a later price than the one the
//! decision could observe.

use super::allocator::{Allocator, SignalAllocator, Step, WeightAllocator};
use super::cost_model::CostModel;
use super::state::Book;
use crate::config::{MissingDecisionPolicy, SimConfig};
use crate::domain::{DecisionTable, Ledger, LedgerRow, Mode, PriceField, PriceFrame};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("config mode is {config} but the decision table holds {table}")]
    ModeMismatch { config: Mode, table: Mode },

    #[error("ticker '{ticker}' missing from the {location}")]
    MissingTicker {
        ticker: String,
        location: &'static str,
    },

    #[error("price frame has no dates")]
    EmptyFrame,

    #[error("invalid {field} price for '{ticker}' on {date}: {value}")]
    InvalidPrice {
        date: NaiveDate,
        ticker: String,
        field: PriceField,
        value: f64,
    },

    #[error("invalid target weight for '{ticker}' on {date}: {value}")]
    InvalidWeight {
        date: NaiveDate,
        ticker: String,
        value: f64,
    },
}

/// Single-use simulator over borrowed, immutable inputs.
pub struct Simulator<'a> {
    prices: &'a PriceFrame,
    config: &'a SimConfig,
    decisions: &'a DecisionTable,
    allocator: Box<dyn Allocator + 'a>,
    /// Price-frame column for each config ticker.
    frame_columns: Vec<usize>,
    book: Book,
}

impl<'a> Simulator<'a> {
    /// Check input shapes and pick the allocator for the table's mode.
    pub fn new(
        prices: &'a PriceFrame,
        decisions: &'a DecisionTable,
        config: &'a SimConfig,
    ) -> Result<Self, SimError> {
        if decisions.mode() != config.mode() {
            return Err(SimError::ModeMismatch {
                config: config.mode(),
                table: decisions.mode(),
            });
        }
        if prices.is_empty() {
            return Err(SimError::EmptyFrame);
        }

        let frame_columns = resolve_columns(config.tickers(), "price frame", |t| {
            prices.ticker_index(t)
        })?;
        let decision_columns = resolve_columns(config.tickers(), "decision table", |t| {
            decisions.ticker_index(t)
        })?;

        let cost = CostModel::from_config(config);
        let allocator: Box<dyn Allocator + 'a> = match decisions {
            DecisionTable::Signals(table) => Box::new(SignalAllocator::new(
                table,
                decision_columns,
                cost,
                config.lot_size(),
            )),
            DecisionTable::Weights(table) => Box::new(WeightAllocator::new(
                table,
                decision_columns,
                cost,
                config.lot_size(),
                config.allow_short(),
            )),
        };

        Ok(Self {
            prices,
            config,
            decisions,
            allocator,
            frame_columns,
            book: Book::new(config.initial_cash(), config.tickers().len()),
        })
    }

    /// Run every date and return the ledger.
    pub fn run(mut self) -> Result<Ledger, SimError> {
        let mut ledger = Ledger::new(self.config.tickers().to_vec());
        let last = self.prices.len() - 1;

        for t in 0..last {
            self.step(t, &mut ledger)?;
        }

        info!(
            allocator = self.allocator.name(),
            rows = ledger.len(),
            fills = ledger.fills().len(),
            final_value = ledger.final_value().unwrap_or(self.config.initial_cash()),
            "simulation complete"
        );
        Ok(ledger)
    }

    fn step(&mut self, t: usize, ledger: &mut Ledger) -> Result<(), SimError> {
        let date = self.prices.dates()[t];
        let row = self.decisions.row_index(date);

        if row.is_none() && self.config.missing_decisions() == MissingDecisionPolicy::Skip {
            debug!(%date, "no decision row, skipping");
            return Ok(());
        }

        let step = Step::new(
            self.prices,
            &self.frame_columns,
            self.config.tickers(),
            t,
            row,
        );

        if row.is_some() {
            let delta = self.allocator.execute(&step, &self.book)?;
            for fill in &delta.fills {
                debug!(
                    ticker = %fill.ticker,
                    side = %fill.side,
                    quantity = fill.quantity,
                    price = fill.price,
                    decided = %fill.decision_date,
                    executed = %fill.execution_date,
                    "fill"
                );
            }
            self.book.apply(&delta);
            ledger.push_fills(delta.fills);
        } else {
            debug!(%date, "no decision row, holding");
        }

        let total_value = self.book.mark_to_market(&step)?;
        ledger.push_row(LedgerRow {
            date,
            cash: self.book.cash(),
            total_value,
            positions: self.book.shares().to_vec(),
        });
        Ok(())
    }
}

/// Run one backtest end to end.
pub fn run_backtest(
    prices: &PriceFrame,
    decisions: &DecisionTable,
    config: &SimConfig,
) -> Result<Ledger, SimError> {
    Simulator::new(prices, decisions, config)?.run()
}

fn resolve_columns(
    tickers: &[String],
    location: &'static str,
    lookup: impl Fn(&str) -> Option<usize>,
) -> Result<Vec<usize>, SimError> {
    tickers
        .iter()
        .map(|t| {
            lookup(t).ok_or_else(|| SimError::MissingTicker {
                ticker: t.clone(),
                location,
            })
        })
        .collect()
}
