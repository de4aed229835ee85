//! The strategy capability interface.

use crate::domain::{Bar, Order, Trade};
use crate::engine::replay::Context;
use anyhow::Result;
use std::collections::BTreeMap;

/// Fixed callback contract between the engine and a strategy.
///
/// One concrete implementation per run; all calls are synchronous within
/// the replay step and must not block. Returning an error aborts the
/// entire run immediately (fail-fast), leaving the engine's state as it
/// was when the error surfaced.
pub trait Strategy {
    /// Called exactly once, before any bar is delivered.
    fn on_init(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Called exactly once at the warm-up → trading boundary.
    fn on_start(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Called once per timestamp with the current multi-instrument
    /// snapshot (backfilled bars included). During warm-up
    /// `ctx.is_trading()` is false; the engine still matches whatever is
    /// in the book, so warm-up gating is the strategy's job.
    fn on_bars(&mut self, ctx: &mut Context, bars: &BTreeMap<String, Bar>) -> Result<()>;

    /// Order state change notification.
    fn on_order(&mut self, _ctx: &mut Context, _order: &Order) -> Result<()> {
        Ok(())
    }

    /// Fill notification.
    fn on_trade(&mut self, _ctx: &mut Context, _trade: &Trade) -> Result<()> {
        Ok(())
    }
}
