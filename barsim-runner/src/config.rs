//! Serializable backtest configuration.

use barsim_core::data::Interval;
use barsim_core::domain::{InstrumentSpec, InstrumentTable};
use barsim_core::engine::EngineSettings;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("backtest span is empty: start {start} >= end {end}")]
    EmptySpan { start: NaiveDate, end: NaiveDate },

    #[error("symbol '{0}' has no [instruments.{0}] entry")]
    MissingInstrument(String),

    #[error("no symbols configured")]
    NoSymbols,
}

/// Per-instrument cost and contract parameters, as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Contract size multiplier.
    pub size: f64,
    /// Commission rate, as a fraction of turnover.
    pub rate: f64,
    /// Slippage cost per unit traded.
    pub slippage: f64,
    /// Minimum price increment.
    pub price_tick: f64,
}

/// One backtest run, fully described.
///
/// TOML shape (dates are quoted `YYYY-MM-DD` strings):
///
/// ```toml
/// symbols = ["CU.SHFE", "RB.SHFE"]
/// interval = "daily"
/// start = "2023-01-01"
/// end = "2024-01-01"
/// capital = 1000000.0
/// warmup_days = 10
///
/// [instruments."CU.SHFE"]
/// size = 5.0
/// rate = 0.0001
/// slippage = 0.2
/// price_tick = 10.0
/// ```
///
/// Every traded symbol must have its own `[instruments.<symbol>]` entry;
/// there are no global scalar defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbols: Vec<String>,
    pub interval: Interval,
    /// Backtest start date (inclusive).
    pub start: NaiveDate,
    /// Backtest end date (exclusive).
    pub end: NaiveDate,
    pub capital: f64,
    #[serde(default)]
    pub warmup_days: usize,
    pub instruments: BTreeMap<String, InstrumentConfig>,
}

impl BacktestConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Reject configurations the engine would have to guess about.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        if self.symbols.is_empty() {
            return Err(ConfigFileError::NoSymbols);
        }
        if self.start >= self.end {
            return Err(ConfigFileError::EmptySpan {
                start: self.start,
                end: self.end,
            });
        }
        for symbol in &self.symbols {
            if !self.instruments.contains_key(symbol) {
                return Err(ConfigFileError::MissingInstrument(symbol.clone()));
            }
        }
        Ok(())
    }

    pub fn instrument_table(&self) -> InstrumentTable {
        let mut table = InstrumentTable::new();
        for (symbol, cfg) in &self.instruments {
            table.insert(InstrumentSpec {
                symbol: symbol.clone(),
                size: cfg.size,
                rate: cfg.rate,
                slippage: cfg.slippage,
                price_tick: cfg.price_tick,
            });
        }
        table
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            symbols: self.symbols.clone(),
            interval: self.interval,
            start: self.start.and_time(NaiveTime::MIN).and_utc(),
            end: self.end.and_time(NaiveTime::MIN).and_utc(),
            capital: self.capital,
            warmup_days: self.warmup_days,
        }
    }

    /// Deterministic content token for this configuration.
    ///
    /// Two identical configs share a token, so sweep results can be
    /// keyed and deduplicated by it.
    pub fn run_token(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().as_str()[..16].to_string()
    }
}
