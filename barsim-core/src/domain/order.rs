//! Limit orders and their lifecycle.

use crate::domain::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of an order or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Signed position delta per unit of volume: +1 long, -1 short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Whether a trade opens or closes a position.
///
/// Informational only: matching and the ledger net positions by
/// direction, they do not enforce offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Offset {
    Open,
    Close,
}

/// Order lifecycle state.
///
/// `Submitting → NotTraded → {AllTraded | Cancelled}`. Exactly one
/// terminal state is reachable; once terminal the order is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted by the book, not yet acknowledged by the simulated exchange.
    Submitting,
    /// Acknowledged, resting, eligible for fills.
    NotTraded,
    /// Fully filled (partial fills are not modeled).
    AllTraded,
    /// Cancelled before any fill.
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::AllTraded | OrderStatus::Cancelled)
    }
}

/// A resting limit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    /// Limit price, already quantized to the instrument's tick size.
    pub price: f64,
    /// Requested volume.
    pub volume: f64,
    /// Filled volume: 0 until `AllTraded`, then equal to `volume`.
    pub traded: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: OrderId,
        symbol: String,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol,
            direction,
            offset,
            price,
            volume,
            traded: 0.0,
            status: OrderStatus::Submitting,
            created_at,
        }
    }

    /// Eligible for matching or cancellation.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Exchange acknowledgment: `Submitting → NotTraded`.
    pub fn acknowledge(&mut self) {
        if self.status == OrderStatus::Submitting {
            self.status = OrderStatus::NotTraded;
        }
    }

    /// Full fill: `→ AllTraded`, filled volume = requested volume.
    pub fn fill(&mut self) {
        if self.is_active() {
            self.traded = self.volume;
            self.status = OrderStatus::AllTraded;
        }
    }

    /// Cancel. No-op on a terminal order.
    pub fn cancel(&mut self) {
        if self.is_active() {
            self.status = OrderStatus::Cancelled;
        }
    }
}
