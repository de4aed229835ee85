//! Per-instrument simulation parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration errors raised at the call site that introduced them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no instrument configured for '{0}'")]
    UnknownInstrument(String),
}

/// Cost and contract parameters for one instrument.
///
/// Consumed, never computed, by the engine: commission rate on turnover,
/// slippage cost per unit traded, contract size multiplier, and the
/// minimum price tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    /// Contract size multiplier applied to every notional calculation.
    pub size: f64,
    /// Commission rate, as a fraction of turnover.
    pub rate: f64,
    /// Modeled execution cost per unit traded, independent of commission.
    pub slippage: f64,
    /// Minimum price increment.
    pub price_tick: f64,
}

impl InstrumentSpec {
    /// Round a price to the nearest multiple of the tick size.
    pub fn quantize(&self, price: f64) -> f64 {
        if self.price_tick > 0.0 {
            (price / self.price_tick).round() * self.price_tick
        } else {
            price
        }
    }
}

/// Symbol → spec mapping with hard lookup errors.
///
/// There are no scalar fallbacks: an order or a ledger pass touching a
/// symbol without a spec is a configuration error, not a silent default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentTable {
    specs: BTreeMap<String, InstrumentSpec>,
}

impl InstrumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: InstrumentSpec) {
        self.specs.insert(spec.symbol.clone(), spec);
    }

    pub fn get(&self, symbol: &str) -> Result<&InstrumentSpec, ConfigError> {
        self.specs
            .get(symbol)
            .ok_or_else(|| ConfigError::UnknownInstrument(symbol.to_string()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.specs.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
