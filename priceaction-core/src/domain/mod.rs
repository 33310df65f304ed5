//! Domain types: bars, positions, instruments and the market snapshot.

pub mod bar;
pub mod direction;
pub mod instrument;
pub mod position;
pub mod snapshot;

pub use bar::{Bar, MIN_RANGE};
pub use direction::{Direction, Side};
pub use instrument::{Instrument, InstrumentError, TickPolicy};
pub use position::Position;
pub use snapshot::{ClosedTrade, MarketSnapshot, NewsEvent};

/// A price level in quote currency.
pub type Price = f64;

/// A position or order size in lots.
pub type Size = f64;
