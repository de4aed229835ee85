//! Historical data: source contract and in-memory cache.

pub mod cache;
pub mod source;

pub use cache::{load_history, BarCache};
pub use source::{BarSource, DataError, Interval};
