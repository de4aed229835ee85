//! In-memory bar cache, keyed (timestamp, symbol).
//!
//! Two-level ordered maps keep both the timeline (outer keys) and the
//! per-instant snapshot (inner maps) in a deterministic order; nothing
//! here depends on hash-map iteration.

use crate::data::source::{BarSource, DataError, Interval};
use crate::domain::Bar;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Size of one load window when pulling history from a source.
const LOAD_WINDOW_DAYS: i64 = 30;

/// Read-only (to the engine) store of all loaded history.
#[derive(Debug, Clone, Default)]
pub struct BarCache {
    bars: BTreeMap<DateTime<Utc>, BTreeMap<String, Bar>>,
}

impl BarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one symbol's bar series, validating the source contract:
    /// ascending timestamps, correct symbol attribution.
    ///
    /// Returns the number of bars inserted.
    pub fn insert_series(&mut self, symbol: &str, bars: Vec<Bar>) -> Result<usize, DataError> {
        let mut last: Option<DateTime<Utc>> = None;
        let count = bars.len();

        for bar in bars {
            if bar.symbol != symbol {
                return Err(DataError::WrongSymbol {
                    expected: symbol.to_string(),
                    got: bar.symbol,
                });
            }
            if let Some(prev) = last {
                if bar.datetime <= prev {
                    return Err(DataError::OutOfOrder {
                        symbol: symbol.to_string(),
                        datetime: bar.datetime,
                    });
                }
            }
            last = Some(bar.datetime);
            self.bars
                .entry(bar.datetime)
                .or_default()
                .insert(symbol.to_string(), bar);
        }
        Ok(count)
    }

    pub fn get(&self, datetime: &DateTime<Utc>, symbol: &str) -> Option<&Bar> {
        self.bars.get(datetime).and_then(|m| m.get(symbol))
    }

    /// All bars present at one instant, ordered by symbol.
    pub fn at(&self, datetime: &DateTime<Utc>) -> Option<&BTreeMap<String, Bar>> {
        self.bars.get(datetime)
    }

    /// Sorted, deduplicated timestamps across every loaded series.
    pub fn timestamps(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.bars.keys()
    }

    /// Number of distinct timestamps.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Pull history for `symbols` from `source` into `cache` in bounded
/// 30-day windows, reporting per-window progress as a fraction in 0..=1.
///
/// Returns the total number of bars loaded.
pub fn load_history(
    source: &dyn BarSource,
    cache: &mut BarCache,
    symbols: &[String],
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    mut progress: Option<&mut dyn FnMut(&str, f64)>,
) -> Result<usize, DataError> {
    let window = Duration::days(LOAD_WINDOW_DAYS);
    let total = (end - start).num_seconds().max(1) as f64;
    let mut loaded = 0;

    for symbol in symbols {
        let mut cursor = start;
        while cursor < end {
            let stop = (cursor + window).min(end);
            let bars = source.load_bars(symbol, interval, cursor, stop)?;
            loaded += cache.insert_series(symbol, bars)?;

            if let Some(report) = progress.as_mut() {
                let fraction = ((stop - start).num_seconds() as f64 / total).min(1.0);
                report(symbol, fraction);
            }
            cursor = stop + interval.step();
        }
    }
    Ok(loaded)
}
