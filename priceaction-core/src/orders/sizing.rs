//! Fixed-risk position sizing.

use crate::config::SizingConfig;
use crate::domain::{Instrument, Price, Size};

/// Size so that a stop-out loses `risk_per_trade`, clamped to the configured
/// bounds and floored to the instrument's size step.
///
/// # Formula
/// ```text
/// size = risk_per_trade / (value_per_point * |entry - stop|)
/// ```
///
/// # Example
/// - Risk per trade: 50
/// - Value per point: 100 per 1.0 size
/// - Stop distance: 10.0
/// - Size: 50 / (100 * 10) = 0.05 -> clamped to max 0.04
#[derive(Debug, Clone)]
pub struct RiskSizer {
    config: SizingConfig,
    instrument: Instrument,
}

impl RiskSizer {
    pub fn new(config: &SizingConfig, instrument: &Instrument) -> Self {
        Self {
            config: config.clone(),
            instrument: instrument.clone(),
        }
    }

    pub fn size(&self, entry: Price, stop: Price) -> Size {
        let distance = (entry - stop).abs();
        let raw = if distance > 0.0 && distance.is_finite() {
            self.config.risk_per_trade / (self.instrument.value_per_point * distance)
        } else {
            self.config.min_size
        };
        self.bound(raw)
    }

    /// Clamp a size to [min, max] on the size-step grid.
    pub fn bound(&self, raw: Size) -> Size {
        let clamped = raw.clamp(self.config.min_size, self.config.max_size);
        self.instrument.floor_size(clamped).max(self.config.min_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    fn sizer() -> RiskSizer {
        RiskSizer::new(&SizingConfig::default(), &Instrument::default())
    }

    #[test]
    fn risk_over_distance() {
        // 50 / (100 * 25) = 0.02
        assert_approx(sizer().size(2000.0, 1975.0), 0.02, 1e-12);
    }

    #[test]
    fn floored_to_step() {
        // 50 / (100 * 15) = 0.0333.. -> 0.03
        assert_approx(sizer().size(2000.0, 1985.0), 0.03, 1e-12);
    }

    #[test]
    fn clamped_to_bounds() {
        assert_approx(sizer().size(2000.0, 1999.0), 0.04, 1e-12);
        assert_approx(sizer().size(2000.0, 1900.0), 0.01, 1e-12);
    }

    #[test]
    fn zero_distance_uses_minimum() {
        assert_approx(sizer().size(2000.0, 2000.0), 0.01, 1e-12);
    }
}
