//! The matching unit: cross active orders against the current snapshot.

use crate::domain::{Bar, Direction, Order, Trade, TradeId};
use crate::engine::order_book::OrderBook;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Observable outcome of one matching pass, in emission order.
#[derive(Debug, Clone)]
pub enum CrossEvent {
    /// An order changed state (acknowledged, filled, ...).
    Order(Order),
    /// A fill happened.
    Trade(Trade),
}

/// Cross every active order against the bar for its instrument at `now`.
///
/// Per order, using only the current bar:
/// - `Submitting` orders first transition to `NotTraded` and emit an
///   order event — one tick of exchange acknowledgment latency. An order
///   that is immediately crossable still passes through `NotTraded`
///   before `AllTraded`; observers rely on the two-step transition.
/// - A long order fills when `price >= bar.low` and `bar.low > 0`; a
///   short order when `price <= bar.high` and `bar.high > 0`. The `> 0`
///   guard keeps degenerate bars out of matching.
/// - Fill price is `min(order.price, bar.open)` for longs and
///   `max(order.price, bar.open)` for shorts: never worse than the limit,
///   with the benefit of a favorable gap open.
/// - Fills are full-volume only; the order leaves the active set and a
///   trade with a strictly increasing id is emitted.
///
/// Orders whose instrument is absent from the snapshot are left pending
/// untouched.
pub fn cross(
    book: &mut OrderBook,
    snapshot: &BTreeMap<String, Bar>,
    now: DateTime<Utc>,
    trade_seq: &mut u64,
) -> Vec<CrossEvent> {
    let mut events = Vec::new();

    for seq in book.active_seqs() {
        let Some(order) = book.order_mut(seq) else {
            continue;
        };
        let Some(bar) = snapshot.get(&order.symbol) else {
            continue;
        };

        if order.status == crate::domain::OrderStatus::Submitting {
            order.acknowledge();
            events.push(CrossEvent::Order(order.clone()));
        }

        let long_cross =
            order.direction == Direction::Long && order.price >= bar.low && bar.low > 0.0;
        let short_cross =
            order.direction == Direction::Short && order.price <= bar.high && bar.high > 0.0;

        if !long_cross && !short_cross {
            continue;
        }

        let trade_price = if long_cross {
            order.price.min(bar.open)
        } else {
            order.price.max(bar.open)
        };

        order.fill();
        events.push(CrossEvent::Order(order.clone()));

        *trade_seq += 1;
        let trade = Trade {
            id: TradeId {
                run: order.id.run.clone(),
                seq: *trade_seq,
            },
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            direction: order.direction,
            offset: order.offset,
            price: trade_price,
            volume: order.volume,
            datetime: now,
        };
        events.push(CrossEvent::Trade(trade));

        book.deactivate(seq);
    }
    events
}
