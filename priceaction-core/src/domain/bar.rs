//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Price;

/// Smallest range used when a bar has zero height, so ratios stay finite.
pub const MIN_RANGE: f64 = 1e-4;

/// OHLC bar for the traded instrument on one timeframe.
///
/// Bars arrive oldest → newest and are never mutated after receipt. The wire
/// format carries the bar start as unix seconds under `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(alias = "time", with = "chrono::serde::ts_seconds")]
    pub start_time: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
}

impl Bar {
    pub fn new(start_time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            start_time,
            open,
            high,
            low,
            close,
        }
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// High/low envelope contains open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }

    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Raw high-low height (may be zero).
    pub fn height(&self) -> f64 {
        self.high - self.low
    }

    /// High-low height floored at [`MIN_RANGE`] for use as a divisor.
    pub fn range(&self) -> f64 {
        self.height().max(MIN_RANGE)
    }

    pub fn is_bull(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bear(&self) -> bool {
        self.close < self.open
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Close location inside the bar: 0.0 at the low, 1.0 at the high.
    pub fn close_position(&self) -> f64 {
        (self.close - self.low) / self.range()
    }

    /// Midpoint of the high-low range.
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}
