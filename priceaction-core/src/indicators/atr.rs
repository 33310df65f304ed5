//! Average true range: the engine's volatility unit.
//!
//! True range is `max(high - low, |high - prev_close|, |low - prev_close|)`.
//! The first bar has no previous close and is left out of the mean.

use crate::domain::Bar;

/// True range per bar; NaN where the bar or its predecessor's close is void.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut prev_close: Option<f64> = None;
    bars.iter()
        .map(|bar| {
            let range = bar.high - bar.low;
            let tr = match prev_close {
                _ if bar.high.is_nan() || bar.low.is_nan() => f64::NAN,
                None => range,
                Some(pc) if pc.is_nan() => f64::NAN,
                Some(pc) => range.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
            };
            prev_close = Some(bar.close);
            tr
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Simple mean of the newest `period` finite true ranges.
    ///
    /// A void bar is skipped and the window reaches one bar further back;
    /// `None` when fewer than `period` usable ranges exist.
    pub fn latest(&self, bars: &[Bar]) -> Option<f64> {
        let recent: Vec<f64> = true_range(bars)
            .into_iter()
            .skip(1)
            .rev()
            .filter(|v| v.is_finite())
            .take(self.period)
            .collect();
        (recent.len() == self.period).then(|| recent.iter().sum::<f64>() / self.period as f64)
    }
}
