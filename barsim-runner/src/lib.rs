//! barsim runner — backtest orchestration on top of `barsim-core`.
//!
//! This crate provides:
//! - TOML run configuration with full per-instrument parameter tables
//! - CSV bar loading behind the core's data source contract
//! - Post-hoc statistics over the finalized daily ledger
//! - Parallel sweeps across independent configurations
//! - Demo strategies

pub mod config;
pub mod data_loader;
pub mod runner;
pub mod statistics;
pub mod strategies;
pub mod sweep;

pub use config::{BacktestConfig, ConfigFileError, InstrumentConfig};
pub use data_loader::CsvBarSource;
pub use runner::{run_backtest, BacktestReport, RunError};
pub use statistics::{compute_statistics, BacktestStatistics};
pub use strategies::ThresholdDip;
pub use sweep::run_sweep;
