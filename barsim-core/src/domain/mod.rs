//! Domain types for barsim.

pub mod bar;
pub mod ids;
pub mod instrument;
pub mod order;
pub mod trade;

pub use bar::Bar;
pub use ids::{OrderId, RunId, TradeId};
pub use instrument::{ConfigError, InstrumentSpec, InstrumentTable};
pub use order::{Direction, Offset, Order, OrderStatus};
pub use trade::Trade;

/// Symbol type alias
pub type Symbol = String;
