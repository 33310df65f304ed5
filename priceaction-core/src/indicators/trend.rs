//! Trend average over closes: EMA (default) or SMA.

use crate::config::TrendKind;

/// Trend average aligned with `closes`; warmup slots are NaN.
pub fn average(closes: &[f64], period: usize, kind: TrendKind) -> Vec<f64> {
    match kind {
        TrendKind::Ema => ema(closes, period),
        TrendKind::Sma => sma(closes, period),
    }
}

/// Exponential average seeded with the simple mean of the first `period`
/// values, `alpha = 2 / (period + 1)`.
///
/// A NaN inside the seed window leaves the whole series NaN; a NaN after the
/// seed ends the series there.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let seed = &values[..period];
    if seed.iter().any(|v| v.is_nan()) {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed.iter().sum::<f64>() / period as f64;
    out[period - 1] = prev;
    for (slot, &v) in out[period..].iter_mut().zip(&values[period..]) {
        if v.is_nan() {
            break;
        }
        prev = alpha * v + (1.0 - alpha) * prev;
        *slot = prev;
    }
    out
}

/// Rolling mean; a window containing NaN yields NaN.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for (i, window) in values.windows(period).enumerate() {
        if window.iter().all(|v| !v.is_nan()) {
            out[i + period - 1] = window.iter().sum::<f64>() / period as f64;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    const RISING: [f64; 5] = [10.0, 11.0, 12.0, 13.0, 14.0];

    #[test]
    fn ema_seeds_with_simple_mean() {
        // alpha = 0.5, seed = mean(10, 11, 12) = 11
        let out = ema(&RISING, 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert_approx(out[3], 12.0, DEFAULT_EPSILON);
        assert_approx(out[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_period_one_tracks_values() {
        assert_eq!(ema(&RISING, 1), RISING.to_vec());
    }

    #[test]
    fn ema_nan_in_seed_blanks_series() {
        let mut values = RISING;
        values[1] = f64::NAN;
        assert!(ema(&values, 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_stops_at_first_nan_after_seed() {
        let mut values = RISING;
        values[3] = f64::NAN;
        let out = ema(&values, 3);
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert!(out[3].is_nan() && out[4].is_nan());
    }

    #[test]
    fn sma_known_values() {
        let out = sma(&RISING, 3);
        assert!(out[1].is_nan());
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert_approx(out[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_only_taints_its_windows() {
        let out = sma(&[1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0], 2);
        assert!(out[1].is_nan() && out[2].is_nan());
        assert_approx(out[3], 3.5, DEFAULT_EPSILON);
        assert_approx(out[5], 5.5, DEFAULT_EPSILON);
    }

    #[test]
    fn short_input_is_all_warmup() {
        assert!(average(&RISING[..2], 3, TrendKind::Ema).iter().all(|v| v.is_nan()));
        assert!(average(&RISING[..2], 3, TrendKind::Sma).iter().all(|v| v.is_nan()));
        assert!(ema(&RISING, 0).iter().all(|v| v.is_nan()));
    }
}
