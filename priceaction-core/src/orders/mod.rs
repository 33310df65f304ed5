//! OrderBuilder and the instruction it emits.
//!
//! - [`builder`]: regime-keyed branches producing entry/stop/target
//! - [`sizing`]: fixed-risk sizing clamped to the configured bounds
//! - [`validate`]: side-consistency gate; violations degrade to HOLD

pub mod builder;
pub mod instruction;
pub mod sizing;
pub mod validate;

pub use builder::{OrderBuilder, OrderContext, OrderOutcome};
pub use instruction::{OrderAction, OrderInstruction};
pub use sizing::RiskSizer;
pub use validate::GeometryError;
