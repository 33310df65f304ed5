//! StructureCounter: pullback counting and reversal detection.
//!
//! Priority per cycle: wedge (score at or above threshold), then the
//! pullback or micro pattern, then the reset override, then the MTR upgrade
//! of second entries.

pub mod mtr;
pub mod pivot;
pub mod pullback;
pub mod wedge;

pub use pivot::{Pivot, PivotKind};
pub use wedge::WedgeScores;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::{EngineConfig, StructureConfig};
use crate::domain::{Bar, Direction};
use crate::indicators::Volatility;

/// One structure label per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Setup {
    None,
    H1,
    H2,
    L1,
    L2,
    MicroDoubleBottom,
    MicroDoubleTop,
    WedgeTop,
    WedgeBottom,
    MtrTop,
    MtrBottom,
    WeakH1,
    WeakL1,
    IgnoreH1,
    IgnoreL1,
    ResetBull,
    ResetBear,
}

impl Setup {
    /// Suppression tags: downstream treats these exactly like `None`.
    pub fn is_suppressed(self) -> bool {
        matches!(
            self,
            Setup::WeakH1 | Setup::WeakL1 | Setup::IgnoreH1 | Setup::IgnoreL1 | Setup::ResetBull | Setup::ResetBear
        )
    }

    pub fn is_actionable(self) -> bool {
        self != Setup::None && !self.is_suppressed()
    }

    /// Wedge and MTR setups trade against the prior trend.
    pub fn is_reversal(self) -> bool {
        matches!(
            self,
            Setup::WedgeTop | Setup::WedgeBottom | Setup::MtrTop | Setup::MtrBottom
        )
    }

    /// Trade direction implied by an actionable setup.
    pub fn direction(self) -> Direction {
        match self {
            Setup::H1 | Setup::H2 | Setup::MicroDoubleBottom | Setup::WedgeBottom | Setup::MtrBottom => {
                Direction::Bull
            }
            Setup::L1 | Setup::L2 | Setup::MicroDoubleTop | Setup::WedgeTop | Setup::MtrTop => {
                Direction::Bear
            }
            _ => Direction::Neutral,
        }
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Setup::None => "NONE",
            Setup::H1 => "H1",
            Setup::H2 => "H2",
            Setup::L1 => "L1",
            Setup::L2 => "L2",
            Setup::MicroDoubleBottom => "MICRO_DOUBLE_BOTTOM",
            Setup::MicroDoubleTop => "MICRO_DOUBLE_TOP",
            Setup::WedgeTop => "WEDGE_TOP",
            Setup::WedgeBottom => "WEDGE_BOTTOM",
            Setup::MtrTop => "MTR_TOP",
            Setup::MtrBottom => "MTR_BOTTOM",
            Setup::WeakH1 => "WEAK_H1",
            Setup::WeakL1 => "WEAK_L1",
            Setup::IgnoreH1 => "IGNORE_H1",
            Setup::IgnoreL1 => "IGNORE_L1",
            Setup::ResetBull => "RESET_BULL",
            Setup::ResetBear => "RESET_BEAR",
        };
        f.write_str(s)
    }
}

/// Result of one structure pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub setup: Setup,
    /// Trend direction the count was taken in.
    pub trend: Direction,
    /// Price the protective stop should sit beyond, when the setup has one.
    pub stop_anchor: Option<f64>,
    pub wedge: WedgeScores,
}

impl StructureReport {
    fn none(trend: Direction, wedge: WedgeScores) -> Self {
        Self {
            setup: Setup::None,
            trend,
            stop_anchor: None,
            wedge,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructureCounter {
    config: StructureConfig,
    close_zone: f64,
}

impl StructureCounter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.structure.clone(),
            close_zone: config.bars.close_zone,
        }
    }

    pub fn analyze(&self, bars: &[Bar], vol: &Volatility, regime_direction: Direction) -> StructureReport {
        let trend = match regime_direction {
            Direction::Neutral => local_slope_direction(vol),
            dir => dir,
        };

        let (scores, wedge) = wedge::evaluate(bars, &self.config);
        debug!(top = scores.top, bottom = scores.bottom, "wedge scores");
        if let Some(w) = wedge {
            let (setup, anchor) = match w.kind {
                PivotKind::High => (Setup::WedgeTop, bars.last().map_or(w.extreme, |b| b.high.max(w.extreme))),
                PivotKind::Low => (Setup::WedgeBottom, bars.last().map_or(w.extreme, |b| b.low.min(w.extreme))),
            };
            return StructureReport {
                setup,
                trend,
                stop_anchor: Some(anchor),
                wedge: scores,
            };
        }

        if trend == Direction::Neutral {
            return StructureReport::none(trend, scores);
        }

        let candidate = pullback::pullback_setup(bars, vol, trend, &self.config)
            .or_else(|| pullback::micro_setup(bars, vol.atr, trend, self.close_zone, &self.config));
        let Some(candidate) = candidate else {
            return StructureReport::none(trend, scores);
        };

        let setup = if pullback::reset_triggered(bars, vol.atr, trend, &self.config) {
            if trend == Direction::Bull {
                Setup::ResetBull
            } else {
                Setup::ResetBear
            }
        } else {
            mtr::upgrade(candidate.setup, bars, vol, &self.config)
        };
        debug!(%setup, raw = %candidate.setup, anchor = candidate.anchor, "structure counted");

        StructureReport {
            setup,
            trend,
            stop_anchor: Some(candidate.anchor),
            wedge: scores,
        }
    }
}

/// Two-bar trend-average slope, used when the regime gives no direction.
fn local_slope_direction(vol: &Volatility) -> Direction {
    let slope = vol.trend_back(0) - vol.trend_back(1);
    if slope > 0.0 {
        Direction::Bull
    } else if slope < 0.0 {
        Direction::Bear
    } else {
        Direction::Neutral
    }
}
