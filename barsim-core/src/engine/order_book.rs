//! Simulated order book: pending and active orders for one engine run.

use crate::domain::{Direction, Offset, Order, OrderId, RunId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Holds every order submitted during a run, keyed by submission
/// sequence, with a separate active set for the matching pass.
///
/// `BTreeMap` keys give deterministic, submission-ordered iteration;
/// sequence numbers are monotonically increasing and never reused.
#[derive(Debug)]
pub struct OrderBook {
    run: RunId,
    next_seq: u64,
    orders: BTreeMap<u64, Order>,
    active: BTreeSet<u64>,
}

impl OrderBook {
    pub fn new(run: RunId) -> Self {
        Self {
            run,
            next_seq: 0,
            orders: BTreeMap::new(),
            active: BTreeSet::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run
    }

    /// Accept a new order in `Submitting` state. The price must already
    /// be quantized to the instrument's tick.
    pub fn submit(
        &mut self,
        symbol: String,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
        now: DateTime<Utc>,
    ) -> OrderId {
        self.next_seq += 1;
        let id = OrderId {
            run: self.run.clone(),
            seq: self.next_seq,
        };
        let order = Order::new(id.clone(), symbol, direction, offset, price, volume, now);
        self.orders.insert(self.next_seq, order);
        self.active.insert(self.next_seq);
        id
    }

    /// Cancel an order. Not an error if the order is unknown or already
    /// terminal; returns the cancelled order only when a cancellation
    /// actually happened.
    pub fn cancel(&mut self, id: &OrderId) -> Option<Order> {
        if id.run != self.run || !self.active.remove(&id.seq) {
            return None;
        }
        let order = self.orders.get_mut(&id.seq)?;
        order.cancel();
        Some(order.clone())
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        if id.run != self.run {
            return None;
        }
        self.orders.get(&id.seq)
    }

    /// Active orders in submission order.
    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.active.iter().filter_map(|seq| self.orders.get(seq))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Every order ever submitted, in submission order.
    pub fn all_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    // Internals for the matching pass.

    pub(crate) fn active_seqs(&self) -> Vec<u64> {
        self.active.iter().copied().collect()
    }

    pub(crate) fn order_mut(&mut self, seq: u64) -> Option<&mut Order> {
        self.orders.get_mut(&seq)
    }

    pub(crate) fn deactivate(&mut self, seq: u64) {
        self.active.remove(&seq);
    }
}
