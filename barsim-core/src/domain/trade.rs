//! Trade — an immutable fill record.

use crate::domain::{Direction, Offset, OrderId, TradeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fill, created only by the matching unit.
///
/// Full-fill-only matching means each order produces at most one trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: f64,
    pub volume: f64,
    pub datetime: DateTime<Utc>,
}

impl Trade {
    /// Signed change to the net position: +volume long, -volume short.
    pub fn position_delta(&self) -> f64 {
        self.direction.sign() * self.volume
    }
}
