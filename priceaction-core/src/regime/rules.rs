//! The regime funnel as an ordered rule list.
//!
//! Rules are evaluated in [`FUNNEL`] order and the first one that matches
//! decides the regime. Each rule is independently testable against a
//! hand-built [`RegimeFactors`].

use serde::{Deserialize, Serialize};

use super::{Regime, RegimeFactors};
use crate::config::RegimeConfig;
use crate::domain::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeRule {
    StrongTrend,
    Barbwire,
    BreakoutMode,
    TradingRange,
    Channel,
}

/// Strict priority order. `Channel` always matches, so the funnel is total.
pub const FUNNEL: [RegimeRule; 5] = [
    RegimeRule::StrongTrend,
    RegimeRule::Barbwire,
    RegimeRule::BreakoutMode,
    RegimeRule::TradingRange,
    RegimeRule::Channel,
];

impl RegimeRule {
    pub fn regime(self) -> Regime {
        match self {
            RegimeRule::StrongTrend => Regime::StrongTrend,
            RegimeRule::Barbwire => Regime::Barbwire,
            RegimeRule::BreakoutMode => Regime::BreakoutMode,
            RegimeRule::TradingRange => Regime::TradingRange,
            RegimeRule::Channel => Regime::Channel,
        }
    }

    /// Direction if the rule fires, `None` otherwise.
    pub fn evaluate(self, f: &RegimeFactors, config: &RegimeConfig) -> Option<Direction> {
        match self {
            RegimeRule::StrongTrend => {
                let steep = f.norm_slope.abs() > f.strong_slope_threshold(config);
                (steep && f.strong_momentum && !f.choppy).then(|| {
                    if f.norm_slope > 0.0 {
                        Direction::Bull
                    } else {
                        Direction::Bear
                    }
                })
            }
            RegimeRule::Barbwire => {
                (f.choppy && f.range10 < config.barbwire_range_atr * f.atr).then_some(Direction::Neutral)
            }
            RegimeRule::BreakoutMode => {
                let compressed = f.range10 < config.breakout_range_atr * f.atr;
                // A quiet stretch after one huge bar inflates ATR; require
                // compression against typical body size as well.
                let squeeze = f.range10 < config.breakout_body_multiple * f.median_body;
                (compressed && squeeze).then(|| match f.bias {
                    Direction::Neutral => Direction::Bull,
                    bias => bias,
                })
            }
            RegimeRule::TradingRange => {
                let congested = f.choppy && f.is_flat(config);
                (f.in_range_band(config) || congested || f.crossings >= config.range_crossings)
                    .then_some(Direction::Neutral)
            }
            RegimeRule::Channel => Some(f.drift(config)),
        }
    }
}

/// Run the funnel. Returns the matching rule and its direction.
pub fn first_match(f: &RegimeFactors, config: &RegimeConfig) -> (RegimeRule, Direction) {
    FUNNEL
        .iter()
        .find_map(|rule| rule.evaluate(f, config).map(|dir| (*rule, dir)))
        .unwrap_or((RegimeRule::Channel, f.drift(config)))
}
