//! LedgerLab Core — price frames, decision tables, signal generators and the
//! portfolio simulator.
//!
//! This crate contains the deterministic heart of a backtest:
//! - Domain types (price frames, decision tables, ledgers, fills)
//! - Validated simulation config
//! - Decision-table generators (SMA crossover, position-and-lag, equal weights)
//! - Date-by-date simulator with next-open execution and close valuation
//!
//! No I/O happens here; loading, scoring and export live in `ledgerlab-runner`.

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signals;

pub use config::{ConfigError, MissingDecisionPolicy, SimConfig, SimConfigBuilder};
pub use domain::{
    DecisionError, DecisionTable, Fill, FrameError, Ledger, LedgerRow, Mode, OrderSide,
    PriceFrame, Signal, SignalTable, WeightRow, WeightTable,
};
pub use engine::{run_backtest, SimError, Simulator};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared inputs and results are Send + Sync.
    ///
    /// Parameter sweeps hand `&PriceFrame` and `&SimConfig` to worker threads
    /// and collect ledgers back. If any type fails this check, the build
    /// breaks immediately.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<PriceFrame>();
        require_sync::<PriceFrame>();
        require_send::<DecisionTable>();
        require_sync::<DecisionTable>();
        require_send::<Ledger>();
        require_sync::<Ledger>();
        require_send::<Fill>();
        require_sync::<Fill>();

        // Config
        require_send::<SimConfig>();
        require_sync::<SimConfig>();

        // Engine
        require_send::<engine::CostModel>();
        require_sync::<engine::CostModel>();
        require_send::<engine::SignalAllocator<'static>>();
        require_sync::<engine::SignalAllocator<'static>>();
        require_send::<engine::WeightAllocator<'static>>();
        require_sync::<engine::WeightAllocator<'static>>();

        // Providers
        require_send::<signals::MaCrossoverProvider>();
        require_sync::<signals::MaCrossoverProvider>();
        require_send::<signals::SmaPositionProvider>();
        require_sync::<signals::SmaPositionProvider>();
        require_send::<signals::ForecastCrossoverProvider>();
        require_sync::<signals::ForecastCrossoverProvider>();
        require_send::<signals::PassThrough>();
        require_sync::<signals::PassThrough>();
    }

    /// Architecture contract: providers see prices, never the book.
    ///
    /// `DecisionProvider::decisions` takes only `&PriceFrame`. If someone adds
    /// a book or ledger parameter, this stops compiling.
    #[test]
    fn provider_trait_has_no_book_parameter() {
        fn _check_trait_object_builds(
            provider: &dyn signals::DecisionProvider,
            prices: &PriceFrame,
        ) -> Result<DecisionTable, signals::SignalError> {
            provider.decisions(prices)
        }
    }
}
