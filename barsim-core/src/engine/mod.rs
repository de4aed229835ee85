//! The backtesting engine: timeline, order book, matching, replay, ledger.
//!
//! Per timestamp the replay loop runs four steps:
//! 1. Build the multi-instrument snapshot, backfilling gaps with flat bars
//! 2. Cross active orders against the snapshot (ack before fill test)
//! 3. Deliver order/trade events and the snapshot to the strategy
//! 4. Record closing prices into the daily ledger

pub mod ledger;
pub mod matching;
pub mod order_book;
pub mod replay;
pub mod strategy;
pub mod timeline;

pub use ledger::{DailyLedger, InstrumentDailyResult, PortfolioDailyResult};
pub use matching::{cross, CrossEvent};
pub use order_book::OrderBook;
pub use replay::{BacktestEngine, Context, EngineError, EngineSettings, LogRecord, Phase};
pub use strategy::Strategy;
pub use timeline::Timeline;
