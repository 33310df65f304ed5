//! Higher-timeframe always-in bias.

use tracing::debug;

use crate::config::RegimeConfig;
use crate::domain::{Bar, Direction};
use crate::indicators::VolatilityEstimator;

/// Bias from the higher-timeframe trend average.
///
/// The slope must exceed its ATR-scaled threshold and the last close must sit
/// on the same side of the average; a flattening average with price already
/// across it yields no bias.
pub fn htf_bias(htf_bars: &[Bar], estimator: &VolatilityEstimator, config: &RegimeConfig) -> Direction {
    if htf_bars.len() < config.htf_min_bars {
        return Direction::Neutral;
    }
    let vol = estimator.measure(htf_bars);
    let slope = vol.in_atr(vol.trend_back(0) - vol.trend_back(config.slope_lookback));
    let trend = vol.latest_trend();
    let close = htf_bars[htf_bars.len() - 1].close;
    if !slope.is_finite() || !trend.is_finite() {
        return Direction::Neutral;
    }

    let bias = if slope > config.htf_slope_atr && close > trend {
        Direction::Bull
    } else if slope < -config.htf_slope_atr && close < trend {
        Direction::Bear
    } else {
        Direction::Neutral
    };
    debug!(htf_slope = slope, htf_close = close, htf_trend = trend, %bias, "higher-timeframe bias");
    bias
}
