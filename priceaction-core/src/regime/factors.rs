//! ATR-normalized inputs to the regime funnel.

use serde::{Deserialize, Serialize};

use crate::config::RegimeConfig;
use crate::domain::{Bar, Direction};
use crate::features::overlap_ratio;
use crate::indicators::Volatility;

/// Everything the regime rules look at, computed once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeFactors {
    pub atr: f64,
    /// Trend-average change over the slope lookback, in ATR units.
    pub norm_slope: f64,
    /// Bars in the crossing window whose range straddles the trend average.
    pub crossings: usize,
    /// High-low extent of the compression window.
    pub range10: f64,
    /// Bars in the compression window overlapping their predecessor.
    pub overlap_bars: usize,
    pub choppy: bool,
    pub strong_momentum: bool,
    /// Median body over the breakout body window.
    pub median_body: f64,
    pub close: f64,
    pub trend: f64,
    /// Higher-timeframe always-in bias.
    pub bias: Direction,
}

impl RegimeFactors {
    pub fn compute(bars: &[Bar], vol: &Volatility, bias: Direction, config: &RegimeConfig) -> Self {
        let atr = vol.atr;
        let n = bars.len();

        let slope = vol.trend_back(0) - vol.trend_back(config.slope_lookback);
        let norm_slope = if slope.is_finite() { vol.in_atr(slope) } else { 0.0 };

        let start = n.saturating_sub(config.crossing_window);
        let crossings = (start..n)
            .filter(|&i| {
                let ta = vol.trend[i];
                ta.is_finite() && bars[i].low < ta && ta < bars[i].high
            })
            .count();

        let window = tail(bars, config.compression_window);
        let range10 = extent(window);

        let overlap_bars = (n.saturating_sub(config.compression_window).max(1)..n)
            .filter(|&i| overlap_ratio(&bars[i], &bars[i - 1]) > config.chop_overlap)
            .count();

        let momentum_floor = config.momentum_body_atr * atr;
        let strong_bodies = tail(bars, 3)
            .iter()
            .filter(|b| b.body() > momentum_floor)
            .count();
        let latest_body = bars.last().map_or(0.0, Bar::body);
        let strong_momentum = strong_bodies >= 2 || latest_body > config.climax_body_atr * atr;

        let mut bodies: Vec<f64> = tail(bars, config.breakout_body_window)
            .iter()
            .map(Bar::body)
            .collect();

        Self {
            atr,
            norm_slope,
            crossings,
            range10,
            overlap_bars,
            choppy: overlap_bars >= config.chop_min_bars,
            strong_momentum,
            median_body: median(&mut bodies),
            close: bars.last().map_or(f64::NAN, |b| b.close),
            trend: vol.latest_trend(),
            bias,
        }
    }

    /// Oscillating around the average or sitting in the mid compression band.
    pub fn range_bound(&self, config: &RegimeConfig) -> bool {
        self.crossings >= config.range_crossings || self.in_range_band(config)
    }

    pub fn in_range_band(&self, config: &RegimeConfig) -> bool {
        self.range10 >= config.range_band_min_atr * self.atr
            && self.range10 <= config.range_band_max_atr * self.atr
    }

    /// Slope needed for STRONG_TREND, raised in congested markets.
    pub fn strong_slope_threshold(&self, config: &RegimeConfig) -> f64 {
        if self.range_bound(config) || self.choppy {
            config.strong_slope_atr * config.range_bound_slope_factor
        } else {
            config.strong_slope_atr
        }
    }

    pub fn is_flat(&self, config: &RegimeConfig) -> bool {
        self.norm_slope.abs() < config.flat_slope_atr
    }

    /// Direction of the slope, or of price against the average when flat.
    pub fn drift(&self, config: &RegimeConfig) -> Direction {
        let signed = if self.is_flat(config) {
            self.close - self.trend
        } else {
            self.norm_slope
        };
        if signed > 0.0 {
            Direction::Bull
        } else if signed < 0.0 {
            Direction::Bear
        } else {
            Direction::Neutral
        }
    }
}

/// Last `len` bars (fewer if the series is shorter).
pub(crate) fn tail(bars: &[Bar], len: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(len)..]
}

/// Highest high minus lowest low.
pub(crate) fn extent(bars: &[Bar]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    high - low
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
