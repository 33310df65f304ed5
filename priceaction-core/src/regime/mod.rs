//! RegimeClassifier ("stage detector").
//!
//! A pure function of the current window: compute [`RegimeFactors`], then run
//! the [`rules::FUNNEL`] in priority order. Nothing carries over between
//! cycles.

pub mod bias;
pub mod factors;
pub mod rules;

pub use bias::htf_bias;
pub use factors::RegimeFactors;
pub use rules::{RegimeRule, FUNNEL};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::{EngineConfig, RegimeConfig};
use crate::domain::{Bar, Direction};
use crate::indicators::{Volatility, VolatilityEstimator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    StrongTrend,
    Channel,
    TradingRange,
    BreakoutMode,
    Barbwire,
    Unknown,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::StrongTrend => "STRONG_TREND",
            Regime::Channel => "CHANNEL",
            Regime::TradingRange => "TRADING_RANGE",
            Regime::BreakoutMode => "BREAKOUT_MODE",
            Regime::Barbwire => "BARBWIRE",
            Regime::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Regime label, its direction and the factors that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: Regime,
    pub direction: Direction,
    pub factors: Option<RegimeFactors>,
}

impl RegimeReading {
    pub fn unknown() -> Self {
        Self {
            regime: Regime::Unknown,
            direction: Direction::Neutral,
            factors: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    config: RegimeConfig,
    htf_estimator: VolatilityEstimator,
}

impl RegimeClassifier {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.regime.clone(),
            htf_estimator: VolatilityEstimator::new(&config.volatility),
        }
    }

    pub fn classify(&self, bars: &[Bar], vol: &Volatility, htf_bars: &[Bar]) -> RegimeReading {
        let bias = htf_bias(htf_bars, &self.htf_estimator, &self.config);
        self.classify_with_bias(bars, vol, bias)
    }

    /// Classify with an externally supplied always-in bias. `vol` must have
    /// been measured on `bars`; anything else reads as UNKNOWN.
    pub fn classify_with_bias(&self, bars: &[Bar], vol: &Volatility, bias: Direction) -> RegimeReading {
        if bars.len() <= self.config.compression_window || vol.trend.len() != bars.len() {
            return RegimeReading::unknown();
        }
        let factors = RegimeFactors::compute(bars, vol, bias, &self.config);
        let (rule, direction) = rules::first_match(&factors, &self.config);
        debug!(
            ?rule,
            norm_slope = factors.norm_slope,
            crossings = factors.crossings,
            range10 = factors.range10,
            choppy = factors.choppy,
            strong_momentum = factors.strong_momentum,
            "regime classified"
        );
        RegimeReading {
            regime: rule.regime(),
            direction,
            factors: Some(factors),
        }
    }
}
