//! Parallel sweeps over independent backtest configurations.
//!
//! Parallelism stops at the engine boundary: each config gets its own
//! fully isolated engine instance on a rayon worker, and no run shares
//! mutable state with another. Within a single replay everything stays
//! sequential.

use crate::config::BacktestConfig;
use crate::data_loader::CsvBarSource;
use crate::runner::{run_backtest, BacktestReport, RunError};
use barsim_core::engine::Strategy;
use rayon::prelude::*;
use std::path::Path;

/// Run every config against CSV data in `data_dir`, one isolated engine
/// per config, in parallel. `make_strategy` builds a fresh strategy for
/// each run. Results are returned in config order.
pub fn run_sweep<S, F>(
    configs: &[BacktestConfig],
    data_dir: &Path,
    make_strategy: F,
) -> Vec<Result<BacktestReport, RunError>>
where
    S: Strategy,
    F: Fn(&BacktestConfig) -> S + Sync,
{
    configs
        .par_iter()
        .map(|config| {
            let source = CsvBarSource::new(data_dir);
            run_backtest(config, &source, make_strategy(config))
        })
        .collect()
}
