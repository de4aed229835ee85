//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLC bar for a single instrument over one interval.
///
/// Immutable once loaded. Volume is optional: backfilled bars and some
/// data feeds carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    /// Synthesize a flat bar that carries `prev` forward through a data gap.
    ///
    /// Open/high/low/close all equal the previous bar's close, so the
    /// instrument keeps a well-defined price at `datetime` without
    /// introducing spurious volatility.
    pub fn carry_forward(prev: &Bar, datetime: DateTime<Utc>) -> Self {
        Self {
            symbol: prev.symbol.clone(),
            datetime,
            open: prev.close,
            high: prev.close,
            low: prev.close,
            close: prev.close,
            volume: None,
        }
    }

    /// Basic OHLC sanity check: high >= low, range brackets open and close.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}
