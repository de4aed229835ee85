//! Single-backtest runner: config + data + strategy → report.

use crate::config::{BacktestConfig, ConfigFileError};
use crate::statistics::{compute_statistics, BacktestStatistics};
use barsim_core::data::{BarSource, DataError};
use barsim_core::domain::{ConfigError, Order, Trade};
use barsim_core::engine::{BacktestEngine, EngineError, PortfolioDailyResult, Strategy};
use thiserror::Error;

/// Errors from a complete backtest run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Ledger(#[from] ConfigError),
}

/// Everything a finished run hands to reporting.
#[derive(Debug)]
pub struct BacktestReport {
    pub run_token: String,
    pub daily_results: Vec<PortfolioDailyResult>,
    pub statistics: BacktestStatistics,
    pub trades: Vec<Trade>,
    pub orders: Vec<Order>,
    /// Formatted engine log lines, in emission order.
    pub logs: Vec<String>,
}

/// Validate the config, load history, replay it through the strategy,
/// finalize the ledger, and compute statistics.
pub fn run_backtest<S: Strategy>(
    config: &BacktestConfig,
    source: &dyn BarSource,
    strategy: S,
) -> Result<BacktestReport, RunError> {
    config.validate()?;

    let mut engine = BacktestEngine::new(
        config.engine_settings(),
        config.instrument_table(),
        strategy,
    );
    engine.load_data(source)?;
    engine.run()?;

    let ctx = engine.context();
    let daily_results = ctx.finalize_ledger()?;
    let statistics = compute_statistics(&daily_results, config.capital);

    Ok(BacktestReport {
        run_token: config.run_token(),
        daily_results,
        statistics,
        trades: ctx.all_trades().to_vec(),
        orders: ctx.all_orders(),
        logs: ctx.logs().iter().map(|r| r.to_string()).collect(),
    })
}
