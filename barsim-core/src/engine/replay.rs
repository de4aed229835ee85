//! The replay loop: advance simulated time bar-by-bar, match, notify.
//!
//! All mutable run state (order book, ledger, bar cache, snapshot, logs)
//! lives inside one engine instance; there are no module-level
//! singletons. The loop is strictly single-threaded and sequential —
//! timestamps are processed in ascending order with no reordering,
//! because position and price state is threaded forward and matching
//! must never see the future.

use crate::data::{load_history, BarCache, BarSource, DataError, Interval};
use crate::domain::{
    Bar, ConfigError, Direction, InstrumentTable, Offset, Order, OrderId, RunId, Trade,
};
use crate::engine::ledger::{DailyLedger, PortfolioDailyResult};
use crate::engine::matching::{cross, CrossEvent};
use crate::engine::order_book::OrderBook;
use crate::engine::strategy::Strategy;
use crate::engine::timeline::Timeline;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Replay state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    WarmingUp,
    Trading,
    Finished,
}

/// One engine log line, stamped with simulated time.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Simulated timestamp at emission; None before the first bar.
    pub datetime: Option<DateTime<Utc>>,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.datetime {
            Some(dt) => write!(f, "{dt}\t{}", self.message),
            None => write!(f, "-\t{}", self.message),
        }
    }
}

/// Launch parameters consumed, not computed, by the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub symbols: Vec<String>,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Starting capital; threaded through to downstream statistics, not
    /// used by the ledger itself.
    pub capital: f64,
    /// Initialization-only span, in distinct trading days.
    pub warmup_days: usize,
}

/// Errors that abort a replay.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("strategy aborted the run: {0}")]
    Strategy(anyhow::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Mutable engine state exposed to the strategy during callbacks.
///
/// The strategy references orders only through opaque ids; the book owns
/// them.
pub struct Context {
    settings: EngineSettings,
    instruments: InstrumentTable,
    cache: BarCache,
    /// Latest per-instrument snapshot. Persists across timestamps so
    /// gaps can be backfilled from the last observed bar.
    bars: BTreeMap<String, Bar>,
    datetime: Option<DateTime<Utc>>,
    book: OrderBook,
    ledger: DailyLedger,
    trades: Vec<Trade>,
    trade_seq: u64,
    logs: Vec<LogRecord>,
    /// Order updates queued during a strategy callback (e.g. cancel
    /// acknowledgments), delivered when the callback returns.
    pending_events: Vec<Order>,
    trading: bool,
}

impl Context {
    fn new(settings: EngineSettings, instruments: InstrumentTable) -> Self {
        Self {
            settings,
            instruments,
            cache: BarCache::new(),
            bars: BTreeMap::new(),
            datetime: None,
            book: OrderBook::new(RunId::generate("backtest")),
            ledger: DailyLedger::new(),
            trades: Vec::new(),
            trade_seq: 0,
            logs: Vec::new(),
            pending_events: Vec::new(),
            trading: false,
        }
    }

    /// Submit a limit order. The price is quantized to the instrument's
    /// tick before acceptance; an unconfigured symbol is refused here,
    /// at the call site that introduced it.
    pub fn send_order(
        &mut self,
        symbol: &str,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
    ) -> Result<OrderId, ConfigError> {
        let spec = self.instruments.get(symbol)?;
        let price = spec.quantize(price);
        let now = self.datetime.unwrap_or(self.settings.start);
        Ok(self
            .book
            .submit(symbol.to_string(), direction, offset, price, volume, now))
    }

    /// Cancel an order. A no-op, not an error, if the order is not
    /// currently active — mirrors real exchange idempotence.
    pub fn cancel_order(&mut self, id: &OrderId) {
        if let Some(order) = self.book.cancel(id) {
            self.pending_events.push(order);
        }
    }

    pub fn write_log(&mut self, message: impl Into<String>) {
        self.logs.push(LogRecord {
            datetime: self.datetime,
            message: message.into(),
        });
    }

    /// Current simulated time; None before the first bar.
    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.datetime
    }

    /// Whether the warm-up span is over. Informational: matching runs
    /// regardless, strategies gate their own order flow on this.
    pub fn is_trading(&self) -> bool {
        self.trading
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn instruments(&self) -> &InstrumentTable {
        &self.instruments
    }

    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.book.get(id)
    }

    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.book.active_orders()
    }

    /// Every order of the current run, in submission order.
    pub fn all_orders(&self) -> Vec<Order> {
        self.book.all_orders().cloned().collect()
    }

    /// Every trade of the current run, in fill order.
    pub fn all_trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn ledger(&self) -> &DailyLedger {
        &self.ledger
    }

    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    /// Finalize the daily ledger into the ascending-date portfolio
    /// result sequence — the sole handoff artifact for statistics.
    pub fn finalize_ledger(&self) -> Result<Vec<PortfolioDailyResult>, ConfigError> {
        self.ledger.finalize(&self.instruments)
    }

    /// Build the current snapshot: exact bar when present, flat
    /// carry-forward bar through gaps, absent until first observation.
    fn advance_snapshot(&mut self, dt: DateTime<Utc>) {
        for symbol in &self.settings.symbols {
            if let Some(bar) = self.cache.get(&dt, symbol) {
                let bar = bar.clone();
                self.bars.insert(symbol.clone(), bar);
            } else if let Some(prev) = self.bars.get(symbol) {
                let synth = Bar::carry_forward(prev, dt);
                self.bars.insert(symbol.clone(), synth);
            }
        }
    }
}

/// The orchestrator: timeline → snapshot → matching → strategy → ledger.
pub struct BacktestEngine<S: Strategy> {
    ctx: Context,
    strategy: S,
    phase: Phase,
}

impl<S: Strategy> BacktestEngine<S> {
    pub fn new(settings: EngineSettings, instruments: InstrumentTable, strategy: S) -> Self {
        Self {
            ctx: Context::new(settings, instruments),
            strategy,
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Pull history for all configured symbols into the cache, in
    /// bounded windows. A span with start >= end loads nothing.
    pub fn load_data(&mut self, source: &dyn BarSource) -> Result<usize, DataError> {
        if self.ctx.settings.start >= self.ctx.settings.end {
            self.ctx.write_log("start must be before end; nothing to load");
            return Ok(0);
        }
        let symbols = self.ctx.settings.symbols.clone();
        let (interval, start, end) = (
            self.ctx.settings.interval,
            self.ctx.settings.start,
            self.ctx.settings.end,
        );

        let mut messages = Vec::new();
        let mut on_progress = |symbol: &str, fraction: f64| {
            messages.push(format!(
                "{symbol} history loading: {:.0}%",
                fraction * 100.0
            ));
        };
        let loaded = load_history(
            source,
            &mut self.ctx.cache,
            &symbols,
            interval,
            start,
            end,
            Some(&mut on_progress),
        )?;

        for message in messages {
            self.ctx.write_log(message);
        }
        self.ctx
            .write_log(format!("history load complete: {loaded} bars"));
        Ok(loaded)
    }

    /// Replay the loaded history through the strategy.
    ///
    /// A single unhandled error from the strategy aborts the entire run
    /// immediately; the engine stops advancing and every structure stays
    /// in its last-consistent state for inspection.
    pub fn run(&mut self) -> Result<(), EngineError> {
        let timeline = Timeline::from_cache(&self.ctx.cache);
        if timeline.is_empty() {
            self.ctx.write_log("empty timeline; replay is a no-op");
            self.phase = Phase::Finished;
            return Ok(());
        }
        let stamps: Vec<DateTime<Utc>> = timeline.iter().copied().collect();
        let split = timeline.warmup_split(self.ctx.settings.warmup_days);

        self.phase = Phase::WarmingUp;
        self.strategy
            .on_init(&mut self.ctx)
            .map_err(EngineError::Strategy)?;
        self.deliver_pending()?;
        self.ctx.write_log("strategy initialized");

        for (ix, dt) in stamps.iter().enumerate() {
            if ix == split {
                self.start_trading()?;
            }
            self.step(*dt)?;
        }
        if split >= stamps.len() {
            self.ctx.write_log("timeline exhausted during warm-up");
        }

        self.phase = Phase::Finished;
        self.ctx.write_log("historical data playback complete");
        Ok(())
    }

    /// Wipe all mutable run state (orders, trades, ledger, snapshot,
    /// logs) while keeping the loaded history, so the same data can be
    /// replayed again. A fresh run id keeps old ids from colliding with
    /// the next run's.
    pub fn reset(&mut self) {
        self.ctx.bars.clear();
        self.ctx.datetime = None;
        self.ctx.book = OrderBook::new(RunId::generate("backtest"));
        self.ctx.ledger = DailyLedger::new();
        self.ctx.trades.clear();
        self.ctx.trade_seq = 0;
        self.ctx.logs.clear();
        self.ctx.pending_events.clear();
        self.ctx.trading = false;
        self.phase = Phase::Uninitialized;
    }

    fn start_trading(&mut self) -> Result<(), EngineError> {
        self.phase = Phase::Trading;
        self.ctx.trading = true;
        self.strategy
            .on_start(&mut self.ctx)
            .map_err(EngineError::Strategy)?;
        self.deliver_pending()?;
        self.ctx.write_log("warm-up complete; trading phase begins");
        Ok(())
    }

    fn step(&mut self, dt: DateTime<Utc>) -> Result<(), EngineError> {
        self.ctx.datetime = Some(dt);
        self.ctx.advance_snapshot(dt);

        // Match resting orders against the new snapshot — only orders
        // placed with information known before `dt` can be in the book
        // here, so causal ordering holds by construction.
        let events = cross(
            &mut self.ctx.book,
            &self.ctx.bars,
            dt,
            &mut self.ctx.trade_seq,
        );
        for event in events {
            match event {
                CrossEvent::Order(order) => {
                    self.strategy
                        .on_order(&mut self.ctx, &order)
                        .map_err(EngineError::Strategy)?;
                    self.deliver_pending()?;
                }
                CrossEvent::Trade(trade) => {
                    self.ctx.ledger.record_trade(trade.clone());
                    self.ctx.trades.push(trade.clone());
                    self.strategy
                        .on_trade(&mut self.ctx, &trade)
                        .map_err(EngineError::Strategy)?;
                    self.deliver_pending()?;
                }
            }
        }

        let bars = self.ctx.bars.clone();
        self.strategy
            .on_bars(&mut self.ctx, &bars)
            .map_err(EngineError::Strategy)?;
        self.deliver_pending()?;

        let date = dt.date_naive();
        for (symbol, bar) in &bars {
            self.ctx.ledger.record_close(date, symbol, bar.close);
        }
        Ok(())
    }

    fn deliver_pending(&mut self) -> Result<(), EngineError> {
        while !self.ctx.pending_events.is_empty() {
            let events = std::mem::take(&mut self.ctx.pending_events);
            for order in events {
                self.strategy
                    .on_order(&mut self.ctx, &order)
                    .map_err(EngineError::Strategy)?;
            }
        }
        Ok(())
    }
}
