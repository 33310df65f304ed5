//! Price-action decision engine.
//!
//! A stateless pipeline that turns one market snapshot into one order
//! instruction:
//! - Volatility unit (ATR) and trend average that scale every threshold
//! - Regime classification through a prioritized rule funnel
//! - Structure counting: pullbacks, micro double tops/bottoms, wedges, MTR
//! - Regime-keyed order construction with risk-bounded sizing
//! - Hard safety gate and position management ahead of new entries
//!
//! Every decision carries a structured [`engine::DecisionTrace`]; the reason
//! string on the instruction is rendered from it.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod features;
pub mod fingerprint;
pub mod indicators;
pub mod management;
pub mod orders;
pub mod regime;
pub mod safety;
pub mod structure;

pub use config::EngineConfig;
pub use engine::{Decision, DecisionEngine, DecisionTrace};
pub use error::{ConfigError, EngineError};
pub use orders::{OrderAction, OrderInstruction};
