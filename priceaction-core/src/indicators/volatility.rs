//! VolatilityEstimator: the ATR volatility unit plus the trend average.
//!
//! Every adaptive threshold downstream is a multiple of [`Volatility::atr`],
//! so the estimator guarantees it is finite and strictly positive.

use tracing::warn;

use super::{trend, Atr};
use crate::config::VolatilityConfig;
use crate::domain::Bar;
use crate::error::EngineError;

/// Volatility unit and trend average for one bar window.
#[derive(Debug, Clone, PartialEq)]
pub struct Volatility {
    /// Mean true range over the configured period. Always > 0.
    pub atr: f64,
    /// Trend average aligned with the input bars (NaN during warmup).
    pub trend: Vec<f64>,
    /// True when the configured default replaced an undefined ATR.
    pub atr_substituted: bool,
}

impl Volatility {
    /// Trend average at the newest bar.
    pub fn latest_trend(&self) -> f64 {
        self.trend.last().copied().unwrap_or(f64::NAN)
    }

    /// Trend average `back` bars before the newest one (0 = newest).
    pub fn trend_back(&self, back: usize) -> f64 {
        self.trend
            .len()
            .checked_sub(1 + back)
            .map_or(f64::NAN, |i| self.trend[i])
    }

    /// Express a price distance in ATR units.
    pub fn in_atr(&self, distance: f64) -> f64 {
        distance / self.atr
    }
}

#[derive(Debug, Clone)]
pub struct VolatilityEstimator {
    config: VolatilityConfig,
    atr: Atr,
}

impl VolatilityEstimator {
    pub fn new(config: &VolatilityConfig) -> Self {
        Self {
            config: config.clone(),
            atr: Atr::new(config.atr_period.max(1)),
        }
    }

    /// Estimate for the primary timeframe. Fails below the history floor.
    pub fn estimate(&self, bars: &[Bar]) -> Result<Volatility, EngineError> {
        if bars.len() < self.config.min_bars {
            return Err(EngineError::InsufficientHistory {
                have: bars.len(),
                need: self.config.min_bars,
            });
        }
        Ok(self.measure(bars))
    }

    /// Estimate without the history floor; used for secondary series whose
    /// own minimum is checked by the caller.
    pub fn measure(&self, bars: &[Bar]) -> Volatility {
        let (atr, atr_substituted) = match self.atr.latest(bars) {
            Some(v) if v.is_finite() && v > 0.0 => (v, false),
            other => {
                warn!(
                    computed = ?other,
                    default_atr = self.config.default_atr,
                    bars = bars.len(),
                    "ATR undefined, substituting configured default"
                );
                (self.config.default_atr, true)
            }
        };

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let trend = trend::average(&closes, self.config.trend_period, self.config.trend_kind);

        Volatility {
            atr,
            trend,
            atr_substituted,
        }
    }
}
