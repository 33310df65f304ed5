//! Structured decision trace.
//!
//! The trace is the source of truth for why a decision was made. The
//! human-readable reason on the instruction is derived from it, never parsed
//! back.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Direction;
use crate::features::BarFeatures;
use crate::fingerprint::ConfigHash;
use crate::orders::GeometryError;
use crate::regime::Regime;
use crate::safety::DenialReason;
use crate::structure::Setup;

/// Which part of the pipeline produced the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Branch {
    /// Stopped before any regime work (safety gate or missing history).
    Gate,
    ForceClose,
    PartialClose,
    TrailStop,
    /// Entry blocked by open-position rules.
    EntryGuard,
    StrongTrend,
    Fade,
    Reversal,
    Channel,
    TradingRange,
    Breakout,
    Barbwire,
    /// No branch applies (unknown regime).
    Idle,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Branch::Gate => "GATE",
            Branch::ForceClose => "FORCE_CLOSE",
            Branch::PartialClose => "PARTIAL_CLOSE",
            Branch::TrailStop => "TRAIL_STOP",
            Branch::EntryGuard => "ENTRY_GUARD",
            Branch::StrongTrend => "STRONG_TREND",
            Branch::Fade => "FADE",
            Branch::Reversal => "REVERSAL",
            Branch::Channel => "CHANNEL",
            Branch::TradingRange => "RANGE",
            Branch::Breakout => "BREAKOUT",
            Branch::Barbwire => "BARBWIRE",
            Branch::Idle => "IDLE",
        };
        f.write_str(s)
    }
}

/// Why a branch held instead of acting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Suppression {
    InsufficientData,
    Safety(DenialReason),
    /// Open position carries unrealized loss.
    Pyramiding,
    MaxExposure,
    /// Degenerate chop.
    Chop,
    /// No actionable structure setup for this branch.
    NoSetup,
    /// Setup points against the regime direction.
    DirectionConflict,
    ClimaxBar,
    MidRange,
    /// In the outer zone of a range but without a qualifying signal bar.
    NoSignalBar,
    VolatilityCeiling,
    InvalidGeometry(GeometryError),
}

impl fmt::Display for Suppression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suppression::InsufficientData => f.write_str("INSUFFICIENT_DATA"),
            Suppression::Safety(reason) => write!(f, "{reason}"),
            Suppression::Pyramiding => f.write_str("PYRAMIDING"),
            Suppression::MaxExposure => f.write_str("MAX_EXPOSURE"),
            Suppression::Chop => f.write_str("CHOP"),
            Suppression::NoSetup => f.write_str("NO_SETUP"),
            Suppression::DirectionConflict => f.write_str("DIRECTION_CONFLICT"),
            Suppression::ClimaxBar => f.write_str("CLIMAX_BAR"),
            Suppression::MidRange => f.write_str("MID_RANGE"),
            Suppression::NoSignalBar => f.write_str("NO_SIGNAL_BAR"),
            Suppression::VolatilityCeiling => f.write_str("VOLATILITY_CEILING"),
            Suppression::InvalidGeometry(err) => write!(f, "INVALID_GEOMETRY({err})"),
        }
    }
}

/// Everything that explains one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub regime: Regime,
    pub direction: Direction,
    pub setup: Setup,
    pub branch: Branch,
    pub suppression: Option<Suppression>,
    /// Volatility unit of the cycle, absent when history was too short.
    pub atr: Option<f64>,
    /// Features of the signal bar, for the log only.
    pub signal_bar: Option<BarFeatures>,
    pub config: ConfigHash,
}

impl DecisionTrace {
    /// `REGIME|SETUP|BRANCH[:SUPPRESSION]`
    pub fn reason(&self) -> String {
        match &self.suppression {
            Some(s) => format!("{}|{}|{}:{}", self.regime, self.setup, self.branch, s),
            None => format!("{}|{}|{}", self.regime, self.setup, self.branch),
        }
    }
}
