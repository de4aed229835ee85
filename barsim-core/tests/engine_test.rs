//! End-to-end replay loop tests: ordering, backfill, matching, warm-up,
//! fail-fast, and ledger rollforward observed through the engine.

use anyhow::{bail, Result};
use barsim_core::data::{BarSource, DataError, Interval};
use barsim_core::domain::{
    Bar, Direction, InstrumentSpec, InstrumentTable, Offset, OrderId, OrderStatus, Trade,
};
use barsim_core::engine::{BacktestEngine, Context, EngineSettings, Phase, Strategy};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

// ── Fixtures ─────────────────────────────────────────────────────────

/// In-memory bar source for tests.
struct MemorySource {
    bars: Vec<Bar>,
}

impl BarSource for MemorySource {
    fn load_bars(
        &self,
        symbol: &str,
        _interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        Ok(self
            .bars
            .iter()
            .filter(|b| b.symbol == symbol && b.datetime >= start && b.datetime <= end)
            .cloned()
            .collect())
    }
}

fn bar(symbol: &str, day: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        symbol: symbol.into(),
        datetime: Utc.with_ymd_and_hms(2024, 1, day, 15, 0, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: Some(1_000.0),
    }
}

fn flat_bar(symbol: &str, day: u32, close: f64) -> Bar {
    bar(symbol, day, close - 0.5, close + 1.0, close - 1.0, close)
}

fn settings(symbols: &[&str], warmup_days: usize) -> EngineSettings {
    EngineSettings {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        interval: Interval::Daily,
        start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        capital: 1_000_000.0,
        warmup_days,
    }
}

fn frictionless(symbols: &[&str]) -> InstrumentTable {
    let mut table = InstrumentTable::new();
    for symbol in symbols {
        table.insert(InstrumentSpec {
            symbol: symbol.to_string(),
            size: 1.0,
            rate: 0.0,
            slippage: 0.0,
            price_tick: 0.01,
        });
    }
    table
}

fn run_engine<S: Strategy>(
    bars: Vec<Bar>,
    symbols: &[&str],
    warmup_days: usize,
    strategy: S,
) -> BacktestEngine<S> {
    let mut engine = BacktestEngine::new(
        settings(symbols, warmup_days),
        frictionless(symbols),
        strategy,
    );
    engine.load_data(&MemorySource { bars }).unwrap();
    engine.run().unwrap();
    engine
}

// ── Ordering ─────────────────────────────────────────────────────────

#[derive(Default)]
struct ClockRecorder {
    seen: Vec<DateTime<Utc>>,
}

impl Strategy for ClockRecorder {
    fn on_bars(&mut self, ctx: &mut Context, _bars: &BTreeMap<String, Bar>) -> Result<()> {
        self.seen.push(ctx.now().expect("now is set during on_bars"));
        Ok(())
    }
}

#[test]
fn timestamps_are_processed_in_strict_ascending_order() {
    let bars = vec![
        flat_bar("A", 2, 100.0),
        flat_bar("A", 3, 101.0),
        flat_bar("B", 3, 50.0),
        flat_bar("A", 4, 102.0),
        flat_bar("B", 4, 51.0),
        flat_bar("B", 5, 52.0),
    ];
    let engine = run_engine(bars, &["A", "B"], 0, ClockRecorder::default());

    let seen = &engine.strategy().seen;
    assert_eq!(seen.len(), 4); // days 2, 3, 4, 5
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

// ── Two-step transition ──────────────────────────────────────────────

#[derive(Default)]
struct OneShotBuyer {
    price: f64,
    volume: f64,
    submitted: bool,
    order_statuses: Vec<OrderStatus>,
    trades: Vec<Trade>,
    events_before_trade: usize,
}

impl Strategy for OneShotBuyer {
    fn on_bars(&mut self, ctx: &mut Context, bars: &BTreeMap<String, Bar>) -> Result<()> {
        if !self.submitted {
            let symbol = bars.keys().next().expect("snapshot is non-empty").clone();
            ctx.send_order(&symbol, Direction::Long, Offset::Open, self.price, self.volume)?;
            self.submitted = true;
        }
        Ok(())
    }

    fn on_order(&mut self, _ctx: &mut Context, order: &barsim_core::domain::Order) -> Result<()> {
        self.order_statuses.push(order.status);
        Ok(())
    }

    fn on_trade(&mut self, _ctx: &mut Context, trade: &Trade) -> Result<()> {
        self.events_before_trade = self.order_statuses.len();
        self.trades.push(trade.clone());
        Ok(())
    }
}

#[test]
fn immediately_crossable_order_passes_through_not_traded_first() {
    // Order submitted on day 2 is crossable on day 3 (105 >= low 100).
    let bars = vec![
        bar("A", 2, 101.0, 103.0, 99.0, 102.0),
        bar("A", 3, 102.0, 106.0, 100.0, 104.0),
    ];
    let strategy = OneShotBuyer {
        price: 105.0,
        volume: 10.0,
        ..Default::default()
    };
    let engine = run_engine(bars, &["A"], 0, strategy);

    let s = engine.strategy();
    assert_eq!(
        s.order_statuses,
        [OrderStatus::NotTraded, OrderStatus::AllTraded]
    );
    // Both order events were observable before the trade arrived.
    assert_eq!(s.events_before_trade, 2);
    assert_eq!(s.trades.len(), 1);
    // Price improvement: min(limit 105, open 102).
    assert_eq!(s.trades[0].price, 102.0);
}

#[test]
fn order_above_the_low_does_not_fill() {
    let bars = vec![
        bar("A", 2, 101.0, 103.0, 99.0, 102.0),
        bar("A", 3, 112.0, 115.0, 110.0, 114.0),
    ];
    let strategy = OneShotBuyer {
        price: 105.0,
        volume: 10.0,
        ..Default::default()
    };
    let engine = run_engine(bars, &["A"], 0, strategy);

    let s = engine.strategy();
    assert_eq!(s.order_statuses, [OrderStatus::NotTraded]);
    assert!(s.trades.is_empty());
    assert_eq!(engine.context().active_orders().count(), 1);
}

// ── Backfill ─────────────────────────────────────────────────────────

#[derive(Default)]
struct SnapshotRecorder {
    snapshots: Vec<BTreeMap<String, Bar>>,
}

impl Strategy for SnapshotRecorder {
    fn on_bars(&mut self, _ctx: &mut Context, bars: &BTreeMap<String, Bar>) -> Result<()> {
        self.snapshots.push(bars.clone());
        Ok(())
    }
}

#[test]
fn gap_is_backfilled_with_flat_bar_at_previous_close() {
    // B trades on day 2 (close 100) and day 4, but not day 3.
    let bars = vec![
        flat_bar("A", 2, 10.0),
        flat_bar("A", 3, 11.0),
        flat_bar("A", 4, 12.0),
        flat_bar("B", 2, 100.0),
        flat_bar("B", 4, 103.0),
    ];
    let engine = run_engine(bars, &["A", "B"], 0, SnapshotRecorder::default());

    let day3 = &engine.strategy().snapshots[1];
    let b = &day3["B"];
    assert_eq!(b.open, 100.0);
    assert_eq!(b.high, 100.0);
    assert_eq!(b.low, 100.0);
    assert_eq!(b.close, 100.0);
    assert_eq!(
        b.datetime,
        Utc.with_ymd_and_hms(2024, 1, 3, 15, 0, 0).unwrap()
    );

    // Day 4 uses the real bar again.
    let day4 = &engine.strategy().snapshots[2];
    assert_eq!(day4["B"].close, 103.0);
}

#[test]
fn never_seen_instrument_is_absent_until_data_appears() {
    // C is configured but has no data until day 4.
    let bars = vec![
        flat_bar("A", 2, 10.0),
        flat_bar("A", 3, 11.0),
        flat_bar("A", 4, 12.0),
        flat_bar("C", 4, 200.0),
    ];
    let engine = run_engine(bars, &["A", "C"], 0, SnapshotRecorder::default());

    let snaps = &engine.strategy().snapshots;
    assert!(!snaps[0].contains_key("C"));
    assert!(!snaps[1].contains_key("C"));
    assert!(snaps[2].contains_key("C"));
}

struct EarlyOrderForLateInstrument {
    submitted: bool,
    order_id: Option<OrderId>,
}

impl Strategy for EarlyOrderForLateInstrument {
    fn on_bars(&mut self, ctx: &mut Context, _bars: &BTreeMap<String, Bar>) -> Result<()> {
        if !self.submitted {
            // C has produced no bar yet; the order must simply rest.
            let id = ctx.send_order("C", Direction::Long, Offset::Open, 250.0, 1.0)?;
            self.order_id = Some(id);
            self.submitted = true;
        }
        Ok(())
    }
}

#[test]
fn orders_for_unseen_instruments_stay_pending_until_data_appears() {
    let bars = vec![
        flat_bar("A", 2, 10.0),
        flat_bar("A", 3, 11.0),
        flat_bar("C", 4, 200.0),
    ];
    let strategy = EarlyOrderForLateInstrument {
        submitted: false,
        order_id: None,
    };
    let engine = run_engine(bars, &["A", "C"], 0, strategy);

    // C appeared on day 4 with low 199 < 250: the resting order filled.
    let id = engine.strategy().order_id.as_ref().unwrap();
    let order = engine.context().order(id).unwrap();
    assert_eq!(order.status, OrderStatus::AllTraded);
    let trades = engine.context().all_trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(
        trades[0].datetime,
        Utc.with_ymd_and_hms(2024, 1, 4, 15, 0, 0).unwrap()
    );
}

// ── Warm-up ──────────────────────────────────────────────────────────

#[derive(Default)]
struct PhaseRecorder {
    inits: usize,
    starts: usize,
    bars_before_init: usize,
    trading_flags: Vec<bool>,
}

impl Strategy for PhaseRecorder {
    fn on_init(&mut self, _ctx: &mut Context) -> Result<()> {
        self.inits += 1;
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<()> {
        self.starts += 1;
        Ok(())
    }

    fn on_bars(&mut self, ctx: &mut Context, _bars: &BTreeMap<String, Bar>) -> Result<()> {
        if self.inits == 0 {
            self.bars_before_init += 1;
        }
        self.trading_flags.push(ctx.is_trading());
        Ok(())
    }
}

#[test]
fn warmup_callbacks_fire_exactly_once_at_the_boundaries() {
    let bars = (2..=6).map(|d| flat_bar("A", d, 100.0)).collect();
    let engine = run_engine(bars, &["A"], 2, PhaseRecorder::default());

    let s = engine.strategy();
    assert_eq!(s.inits, 1);
    assert_eq!(s.starts, 1);
    assert_eq!(s.bars_before_init, 0);
    // Two warm-up days, then three trading days.
    assert_eq!(s.trading_flags, [false, false, true, true, true]);
    assert_eq!(engine.phase(), Phase::Finished);
}

// ── Fail-fast ────────────────────────────────────────────────────────

#[derive(Default)]
struct FailsOnThirdBar {
    calls: usize,
}

impl Strategy for FailsOnThirdBar {
    fn on_bars(&mut self, _ctx: &mut Context, _bars: &BTreeMap<String, Bar>) -> Result<()> {
        self.calls += 1;
        if self.calls == 3 {
            bail!("strategy blew up");
        }
        Ok(())
    }
}

#[test]
fn strategy_error_aborts_the_run_and_preserves_state() {
    let bars = (2..=6).map(|d| flat_bar("A", d, 100.0)).collect();
    let mut engine = BacktestEngine::new(
        settings(&["A"], 0),
        frictionless(&["A"]),
        FailsOnThirdBar::default(),
    );
    engine.load_data(&MemorySource { bars }).unwrap();

    let err = engine.run().unwrap_err();
    assert!(err.to_string().contains("strategy blew up"));
    assert_ne!(engine.phase(), Phase::Finished);
    // The failing bar's close was never recorded: two consistent days remain.
    assert_eq!(engine.context().ledger().day_count(), 2);
}

// ── Cancellation ─────────────────────────────────────────────────────

#[derive(Default)]
struct CancelAfterFill {
    submitted: bool,
    filled_id: Option<OrderId>,
    cancel_acks: usize,
}

impl Strategy for CancelAfterFill {
    fn on_bars(&mut self, ctx: &mut Context, _bars: &BTreeMap<String, Bar>) -> Result<()> {
        if !self.submitted {
            ctx.send_order("A", Direction::Long, Offset::Open, 105.0, 10.0)?;
            self.submitted = true;
        } else if let Some(id) = self.filled_id.clone() {
            // Cancelling an already-filled order must be a silent no-op.
            ctx.cancel_order(&id);
        }
        Ok(())
    }

    fn on_order(&mut self, _ctx: &mut Context, order: &barsim_core::domain::Order) -> Result<()> {
        if order.status == OrderStatus::Cancelled {
            self.cancel_acks += 1;
        }
        Ok(())
    }

    fn on_trade(&mut self, _ctx: &mut Context, trade: &Trade) -> Result<()> {
        self.filled_id = Some(trade.order_id.clone());
        Ok(())
    }
}

#[test]
fn cancelling_a_filled_order_changes_nothing() {
    let bars = vec![
        bar("A", 2, 101.0, 103.0, 99.0, 102.0),
        bar("A", 3, 102.0, 106.0, 100.0, 104.0),
        bar("A", 4, 104.0, 107.0, 103.0, 105.0),
    ];
    let engine = run_engine(bars, &["A"], 0, CancelAfterFill::default());

    let s = engine.strategy();
    assert_eq!(s.cancel_acks, 0);
    assert_eq!(engine.context().all_trades().len(), 1);

    let id = s.filled_id.as_ref().unwrap();
    assert_eq!(
        engine.context().order(id).unwrap().status,
        OrderStatus::AllTraded
    );

    // The recorded trade still flows into the daily results.
    let daily = engine.context().finalize_ledger().unwrap();
    let total_trades: usize = daily.iter().map(|d| d.trade_count).sum();
    assert_eq!(total_trades, 1);
}

// ── Ledger rollforward through the engine ────────────────────────────

#[derive(Default)]
struct BuyTenAtFortyNine {
    submitted: bool,
}

impl Strategy for BuyTenAtFortyNine {
    fn on_bars(&mut self, ctx: &mut Context, _bars: &BTreeMap<String, Bar>) -> Result<()> {
        if !self.submitted {
            ctx.send_order("Y", Direction::Long, Offset::Open, 49.0, 10.0)?;
            self.submitted = true;
        }
        Ok(())
    }
}

#[test]
fn ledger_rollforward_matches_hand_computation() {
    // Day 2: close 50, order placed. Day 3: fills at 49 (open 49, low 48),
    // close 50. Day 4: no trades, close 55.
    let bars = vec![
        bar("Y", 2, 50.0, 51.0, 49.5, 50.0),
        bar("Y", 3, 49.0, 50.5, 48.0, 50.0),
        bar("Y", 4, 54.0, 56.0, 53.0, 55.0),
    ];
    let engine = run_engine(bars, &["Y"], 0, BuyTenAtFortyNine::default());

    let daily = engine.context().finalize_ledger().unwrap();
    assert_eq!(daily.len(), 3);

    let fill_day = &daily[1].instrument_results["Y"];
    assert_eq!(fill_day.trading_pnl, (50.0 - 49.0) * 10.0);
    assert_eq!(fill_day.holding_pnl, 0.0);
    assert_eq!(fill_day.end_pos, 10.0);

    let hold_day = &daily[2].instrument_results["Y"];
    assert_eq!(hold_day.trading_pnl, 0.0);
    assert_eq!(hold_day.holding_pnl, 10.0 * (55.0 - 50.0));
    assert_eq!(hold_day.start_pos, 10.0);
    assert_eq!(hold_day.pre_close, 50.0);
}

// ── Empty run ────────────────────────────────────────────────────────

struct NeverTrades;

impl Strategy for NeverTrades {
    fn on_bars(&mut self, _ctx: &mut Context, _bars: &BTreeMap<String, Bar>) -> Result<()> {
        Ok(())
    }
}

#[test]
fn empty_run_yields_zero_net_pnl_every_date() {
    let bars = (2..=6).map(|d| flat_bar("A", d, 100.0)).collect();
    let engine = run_engine(bars, &["A"], 0, NeverTrades);

    let daily = engine.context().finalize_ledger().unwrap();
    assert_eq!(daily.len(), 5);
    for day in &daily {
        assert_eq!(day.net_pnl, 0.0);
        assert_eq!(day.trade_count, 0);
    }
}

// ── Finalize idempotence through the engine ──────────────────────────

#[test]
fn finalize_twice_yields_identical_sequences() {
    let bars = vec![
        bar("Y", 2, 50.0, 51.0, 49.5, 50.0),
        bar("Y", 3, 49.0, 50.5, 48.0, 50.0),
        bar("Y", 4, 54.0, 56.0, 53.0, 55.0),
    ];
    let engine = run_engine(bars, &["Y"], 0, BuyTenAtFortyNine::default());

    let first = engine.context().finalize_ledger().unwrap();
    let second = engine.context().finalize_ledger().unwrap();
    assert_eq!(first, second);
}
