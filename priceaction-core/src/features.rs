//! BarFeatureExtractor: qualitative reading of a single bar.
//!
//! Features are relative to the bar's own range and to the volatility unit,
//! never to fixed price amounts.

use serde::{Deserialize, Serialize};

use crate::config::BarConfig;
use crate::domain::{Bar, Direction};

/// Which tail, if any, shows a rejected push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    None,
    /// Long upper wick: buyers pushed up and were rejected.
    TopTail,
    /// Long lower wick: sellers pushed down and were rejected.
    BottomTail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarFeatures {
    pub control: Direction,
    pub is_trend_bar: bool,
    pub rejection: Rejection,
    /// Share of the previous bar's range overlapped by this bar, in [0, 1].
    pub overlap_pct: f64,
}

/// Overlap of `bar` with `prev` as a fraction of `prev`'s range.
pub fn overlap_ratio(bar: &Bar, prev: &Bar) -> f64 {
    let top = bar.high.min(prev.high);
    let bottom = bar.low.max(prev.low);
    if top <= bottom {
        return 0.0;
    }
    ((top - bottom) / prev.range()).min(1.0)
}

#[derive(Debug, Clone)]
pub struct BarFeatureExtractor {
    config: BarConfig,
}

impl BarFeatureExtractor {
    pub fn new(config: &BarConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn extract(&self, bar: &Bar, prev: Option<&Bar>, atr: f64) -> BarFeatures {
        BarFeatures {
            control: self.control(bar),
            is_trend_bar: self.is_trend_bar(bar, atr),
            rejection: self.rejection(bar),
            overlap_pct: prev.map_or(0.0, |p| overlap_ratio(bar, p)),
        }
    }

    /// Close in the top zone is bull control, bottom zone bear control.
    pub fn control(&self, bar: &Bar) -> Direction {
        let pos = bar.close_position();
        if pos >= 1.0 - self.config.close_zone {
            Direction::Bull
        } else if pos <= self.config.close_zone {
            Direction::Bear
        } else {
            Direction::Neutral
        }
    }

    pub fn is_trend_bar(&self, bar: &Bar, atr: f64) -> bool {
        bar.body() > atr * self.config.trend_bar_atr
    }

    pub fn rejection(&self, bar: &Bar) -> Rejection {
        let body = bar.body();
        let min_tail = bar.range() * self.config.tail_ratio;
        let upper = bar.upper_wick();
        let lower = bar.lower_wick();
        if upper > body && upper > min_tail {
            Rejection::TopTail
        } else if lower > body && lower > min_tail {
            Rejection::BottomTail
        } else {
            Rejection::None
        }
    }
}
