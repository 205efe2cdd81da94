//! Parameter sweep over moving-average crossover windows.
//!
//! Every grid point is an independent backtest over the same shared prices
//! and config. Points run in parallel with Rayon; results come back sorted by
//! `(fast, slow)` so output does not depend on scheduling. The sweep reports
//! every point and does not pick a winner.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use ledgerlab_core::signals::MaCrossoverProvider;
use ledgerlab_core::{Mode, SimConfig};

use crate::data_loader::LoadedData;
use crate::metrics::PerformanceMetrics;
use crate::runner::{run_backtest_from_data, RunError};

/// Fast and slow windows to combine. Pairs with `fast >= slow` are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub fast: Vec<usize>,
    pub slow: Vec<usize>,
}

impl SweepGrid {
    pub fn new(fast: Vec<usize>, slow: Vec<usize>) -> Self {
        Self { fast, slow }
    }

    /// Valid `(fast, slow)` pairs, sorted and deduplicated.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .fast
            .iter()
            .flat_map(|&f| self.slow.iter().map(move |&s| (f, s)))
            .filter(|&(f, s)| f >= 1 && f < s)
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    pub fn size(&self) -> usize {
        self.pairs().len()
    }
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            fast: vec![5, 10, 20],
            slow: vec![30, 50, 100],
        }
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub fast: usize,
    pub slow: usize,
    pub metrics: PerformanceMetrics,
    pub fill_count: usize,
}

/// Run every grid point against the same prices and config.
///
/// The config must be in signals mode.
pub fn run_sweep(
    data: &LoadedData,
    config: &SimConfig,
    grid: &SweepGrid,
) -> Result<Vec<SweepEntry>, RunError> {
    if config.mode() != Mode::Signals {
        return Err(RunError::SweepMode(config.mode()));
    }
    let pairs = grid.pairs();
    info!(points = pairs.len(), "starting sweep");

    let mut entries = pairs
        .par_iter()
        .map(|&(fast, slow)| -> Result<SweepEntry, RunError> {
            let provider = MaCrossoverProvider::new(fast, slow)?;
            let run_id = format!("{}:{fast}:{slow}", data.dataset_hash);
            let result = run_backtest_from_data(data, &provider, config, run_id)?;
            Ok(SweepEntry {
                fast,
                slow,
                metrics: result.metrics,
                fill_count: result.ledger.fills().len(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    entries.sort_by_key(|e| (e.fast, e.slow));
    Ok(entries)
}
