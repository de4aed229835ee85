//! Built-in demo strategies.

use anyhow::Result;
use barsim_core::domain::{Bar, Direction, Offset, OrderId, Trade};
use barsim_core::engine::{Context, Strategy};
use std::collections::BTreeMap;

/// Buy-the-dip demo strategy.
///
/// Keeps one working order per instrument: a long entry resting a
/// fraction below the latest close while flat, and a closing sell a
/// fraction above the latest close while long. The working order is
/// cancelled and re-priced every bar. Gates itself on `is_trading`, so
/// nothing rests in the book during warm-up.
pub struct ThresholdDip {
    entry_discount: f64,
    exit_premium: f64,
    volume: f64,
    position: BTreeMap<String, f64>,
    working: BTreeMap<String, OrderId>,
}

impl ThresholdDip {
    pub fn new(entry_discount: f64, exit_premium: f64, volume: f64) -> Self {
        Self {
            entry_discount,
            exit_premium,
            volume,
            position: BTreeMap::new(),
            working: BTreeMap::new(),
        }
    }

    pub fn position(&self, symbol: &str) -> f64 {
        self.position.get(symbol).copied().unwrap_or(0.0)
    }
}

impl Strategy for ThresholdDip {
    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.write_log("threshold-dip strategy started");
        Ok(())
    }

    fn on_bars(&mut self, ctx: &mut Context, bars: &BTreeMap<String, Bar>) -> Result<()> {
        if !ctx.is_trading() {
            return Ok(());
        }
        for (symbol, bar) in bars {
            if let Some(id) = self.working.remove(symbol) {
                ctx.cancel_order(&id);
            }
            let position = self.position(symbol);
            let id = if position <= 0.0 {
                ctx.send_order(
                    symbol,
                    Direction::Long,
                    Offset::Open,
                    bar.close * (1.0 - self.entry_discount),
                    self.volume,
                )?
            } else {
                ctx.send_order(
                    symbol,
                    Direction::Short,
                    Offset::Close,
                    bar.close * (1.0 + self.exit_premium),
                    position,
                )?
            };
            self.working.insert(symbol.clone(), id);
        }
        Ok(())
    }

    fn on_trade(&mut self, ctx: &mut Context, trade: &Trade) -> Result<()> {
        *self.position.entry(trade.symbol.clone()).or_default() += trade.position_delta();
        ctx.write_log(format!(
            "filled {:?} {} x{} @ {}",
            trade.direction, trade.symbol, trade.volume, trade.price
        ));
        Ok(())
    }
}
