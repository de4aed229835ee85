//! Simulation timeline and warm-up split.

use crate::data::BarCache;
use chrono::{DateTime, NaiveDate, Utc};

/// The sorted, deduplicated sequence of simulation timestamps across all
/// loaded instruments.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    stamps: Vec<DateTime<Utc>>,
}

impl Timeline {
    pub fn from_cache(cache: &BarCache) -> Self {
        Self {
            stamps: cache.timestamps().copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.stamps.iter()
    }

    /// Index of the first timestamp in the trading phase.
    ///
    /// The first `days` trading days, counted by distinct calendar-date
    /// transitions, are initialization-only. Returns `len()` when the
    /// whole timeline falls inside the warm-up span, and 0 when `days`
    /// is 0.
    pub fn warmup_split(&self, days: usize) -> usize {
        if days == 0 {
            return 0;
        }
        let mut transitions = 0;
        let mut prev_date: Option<NaiveDate> = None;

        for (ix, dt) in self.stamps.iter().enumerate() {
            let date = dt.date_naive();
            if let Some(prev) = prev_date {
                if date != prev {
                    transitions += 1;
                    if transitions >= days {
                        return ix;
                    }
                }
            }
            prev_date = Some(date);
        }
        self.stamps.len()
    }
}
