//! CSV bar loading for the runner.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, rows in ascending time
//! order with the header `datetime,open,high,low,close,volume`.
//! Datetimes are `YYYY-MM-DD HH:MM:SS` or bare `YYYY-MM-DD` (midnight),
//! interpreted as UTC.

use barsim_core::data::{BarSource, DataError, Interval};
use barsim_core::domain::Bar;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvBarRow {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads bars from per-symbol CSV files in one directory.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl BarSource for CsvBarSource {
    fn load_bars(
        &self,
        symbol: &str,
        _interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DataError::Source(format!("{}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvBarRow>() {
            let row = row.map_err(|e| DataError::Source(format!("{}: {e}", path.display())))?;
            let naive = parse_datetime(&row.datetime).ok_or_else(|| {
                DataError::Source(format!(
                    "{}: unparseable datetime '{}'",
                    path.display(),
                    row.datetime
                ))
            })?;
            let datetime = naive.and_utc();
            if datetime < start || datetime > end {
                continue;
            }
            bars.push(Bar {
                symbol: symbol.to_string(),
                datetime,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        Ok(bars)
    }
}
