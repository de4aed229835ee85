//! Run, order, and trade identifiers.
//!
//! Every id is scoped to one engine run: a short `RunId` token plus a
//! per-run sequence number that is monotonically increasing and never
//! reused. Two engines running side by side in the same process can
//! therefore never hand out colliding order or trade ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter folded into every generated run id.
static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Short token identifying one engine run.
///
/// Derived with BLAKE3 from a caller-supplied label and a process-wide
/// counter, truncated to 12 hex chars. Unique within a process even when
/// many engines are created with the same label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn generate(label: &str) -> Self {
        let n = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(label.as_bytes());
        hasher.update(&n.to_le_bytes());
        let hex = hasher.finalize().to_hex();
        Self(hex.as_str()[..12].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order id: run token + per-run submission sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId {
    pub run: RunId,
    pub seq: u64,
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.run, self.seq)
    }
}

/// Trade id: run token + per-run fill sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId {
    pub run: RunId,
    pub seq: u64,
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.run, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique_for_same_label() {
        let a = RunId::generate("backtest");
        let b = RunId::generate("backtest");
        assert_ne!(a, b);
    }

    #[test]
    fn order_id_display_is_run_dot_seq() {
        let run = RunId::generate("x");
        let id = OrderId { run: run.clone(), seq: 7 };
        assert_eq!(format!("{id}"), format!("{run}.7"));
    }

    #[test]
    fn ids_from_different_runs_never_collide() {
        let a = OrderId { run: RunId::generate("a"), seq: 1 };
        let b = OrderId { run: RunId::generate("b"), seq: 1 };
        assert_ne!(a, b);
    }
}
