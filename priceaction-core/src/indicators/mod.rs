//! Volatility unit and trend average.
//!
//! Everything downstream is normalized against the two series the
//! [`VolatilityEstimator`] produces: the ATR and the trend average. Series
//! are aligned with the input bars, with NaN in warmup slots.

pub mod atr;
pub mod trend;
pub mod volatility;

pub use atr::{true_range, Atr};
pub use volatility::{Volatility, VolatilityEstimator};

#[cfg(test)]
use crate::domain::Bar;

/// Synthetic 5-minute bars from closes: each opens at the previous close and
/// extends 1.0 beyond its body on both sides.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut open = closes.first().copied().unwrap_or(0.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let bar = Bar::new(
                base + Duration::minutes(5 * i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
            );
            open = close;
            bar
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
