//! The historical data source contract.

use crate::domain::Bar;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bar interval granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Minute,
    Hour,
    Daily,
}

impl Interval {
    /// Duration of one bar at this granularity.
    pub fn step(&self) -> Duration {
        match self {
            Interval::Minute => Duration::minutes(1),
            Interval::Hour => Duration::hours(1),
            Interval::Daily => Duration::days(1),
        }
    }
}

/// Errors from the data layer.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("bars for '{symbol}' are not in ascending time order at {datetime}")]
    OutOfOrder {
        symbol: String,
        datetime: DateTime<Utc>,
    },

    #[error("bar attributed to '{got}' while loading '{expected}'")]
    WrongSymbol { expected: String, got: String },

    #[error("data source error: {0}")]
    Source(String),
}

/// Supplies historical bars in bounded time windows.
///
/// Implementations must return bars ascending in time and attributed to
/// the requested symbol; the cache verifies both on insertion.
pub trait BarSource {
    fn load_bars(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError>;
}
