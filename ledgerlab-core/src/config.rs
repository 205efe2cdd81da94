//! Simulation configuration and its validating builder.
//!
//! A [`SimConfig`] can only be obtained through [`SimConfigBuilder::build`],
//! so every config that reaches the simulator has already been checked.

use crate::domain::Mode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("initial cash must be positive and finite, got {0}")]
    InvalidInitialCash(f64),

    #[error("{field} must be a finite, non-negative rate, got {value}")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("transaction cost plus slippage must stay below 1.0, got {0}")]
    CombinedRateTooHigh(f64),

    #[error("lot size must be at least 1")]
    ZeroLotSize,

    #[error("no tickers configured")]
    NoTickers,

    #[error("duplicate ticker '{0}'")]
    DuplicateTicker(String),
}

/// What the simulator does on a date that has no decision row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDecisionPolicy {
    /// No trade and no ledger row.
    #[default]
    Skip,
    /// No trade, but the book is still valued and recorded.
    Hold,
}

/// Immutable parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimConfig {
    initial_cash: f64,
    mode: Mode,
    transaction_cost_bps: f64,
    slippage_bps: f64,
    lot_size: u32,
    allow_short: bool,
    tickers: Vec<String>,
    missing_decisions: MissingDecisionPolicy,
}

impl SimConfig {
    pub fn builder(initial_cash: f64, mode: Mode, tickers: Vec<String>) -> SimConfigBuilder {
        SimConfigBuilder {
            initial_cash,
            mode,
            tickers,
            transaction_cost_bps: 0.0,
            slippage_bps: 0.0,
            lot_size: 1,
            allow_short: false,
            missing_decisions: MissingDecisionPolicy::Skip,
        }
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Transaction cost as a fractional rate (0.0001 = 1 bp).
    pub fn transaction_cost_bps(&self) -> f64 {
        self.transaction_cost_bps
    }

    /// Slippage as a fractional rate (0.0001 = 1 bp).
    pub fn slippage_bps(&self) -> f64 {
        self.slippage_bps
    }

    pub fn lot_size(&self) -> u32 {
        self.lot_size
    }

    pub fn allow_short(&self) -> bool {
        self.allow_short
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn missing_decisions(&self) -> MissingDecisionPolicy {
        self.missing_decisions
    }
}

/// Builder for [`SimConfig`]. Frictionless, lot size 1, long only and
/// `Skip` on missing decisions unless told otherwise.
#[derive(Debug, Clone)]
pub struct SimConfigBuilder {
    initial_cash: f64,
    mode: Mode,
    tickers: Vec<String>,
    transaction_cost_bps: f64,
    slippage_bps: f64,
    lot_size: u32,
    allow_short: bool,
    missing_decisions: MissingDecisionPolicy,
}

impl SimConfigBuilder {
    pub fn transaction_cost_bps(mut self, rate: f64) -> Self {
        self.transaction_cost_bps = rate;
        self
    }

    pub fn slippage_bps(mut self, rate: f64) -> Self {
        self.slippage_bps = rate;
        self
    }

    pub fn lot_size(mut self, lot_size: u32) -> Self {
        self.lot_size = lot_size;
        self
    }

    pub fn allow_short(mut self, allow: bool) -> Self {
        self.allow_short = allow;
        self
    }

    pub fn missing_decisions(mut self, policy: MissingDecisionPolicy) -> Self {
        self.missing_decisions = policy;
        self
    }

    pub fn build(self) -> Result<SimConfig, ConfigError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(ConfigError::InvalidInitialCash(self.initial_cash));
        }
        check_rate("transaction_cost_bps", self.transaction_cost_bps)?;
        check_rate("slippage_bps", self.slippage_bps)?;
        // A sell price of raw * (1 - rate) must stay positive.
        let combined = self.transaction_cost_bps + self.slippage_bps;
        if combined >= 1.0 {
            return Err(ConfigError::CombinedRateTooHigh(combined));
        }
        if self.lot_size == 0 {
            return Err(ConfigError::ZeroLotSize);
        }
        if self.tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }
        let mut seen = HashSet::new();
        for t in &self.tickers {
            if !seen.insert(t.as_str()) {
                return Err(ConfigError::DuplicateTicker(t.clone()));
            }
        }

        Ok(SimConfig {
            initial_cash: self.initial_cash,
            mode: self.mode,
            transaction_cost_bps: self.transaction_cost_bps,
            slippage_bps: self.slippage_bps,
            lot_size: self.lot_size,
            allow_short: self.allow_short,
            tickers: self.tickers,
            missing_decisions: self.missing_decisions,
        })
    }
}

fn check_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { field, value })
    }
}
