//! Wedge reversal scoring over asymmetric pivots.

use serde::{Deserialize, Serialize};

use super::pivot::{wedge_pivots, Pivot, PivotKind};
use crate::config::StructureConfig;
use crate::domain::Bar;

const THREE_PUSHES: i32 = 40;
const DECELERATING: i32 = 30;
const NEAR_PARALLEL: i32 = 10;
const ACCELERATING: i32 = -20;
const OPPOSING_BODY: i32 = 20;
const OPPOSING_WICK: i32 = 10;

/// Scores for both wedge candidates in the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WedgeScores {
    pub top: i32,
    pub bottom: i32,
}

/// The winning side of a wedge evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    pub kind: PivotKind,
    pub score: i32,
    /// Extreme of the third push.
    pub extreme: f64,
}

impl WedgeScores {
    /// Higher side wins if it clears the threshold; ties never fire.
    pub fn winner(&self, threshold: i32) -> Option<PivotKind> {
        if self.top > self.bottom && self.top >= threshold {
            Some(PivotKind::High)
        } else if self.bottom > self.top && self.bottom >= threshold {
            Some(PivotKind::Low)
        } else {
            None
        }
    }
}

/// Score one side from its three most recent pivots and the signal bar.
pub fn score(pivots: &[Pivot], bars: &[Bar], kind: PivotKind, config: &StructureConfig) -> i32 {
    let Some(last) = pivots.last() else {
        return 0;
    };
    let mut total = 0;

    if let [p1, p2, p3] = &pivots[pivots.len().saturating_sub(3)..] {
        // Distances pushed in the wedge direction (positive when extending).
        let (push1, push2) = match kind {
            PivotKind::High => (p2.price - p1.price, p3.price - p2.price),
            PivotKind::Low => (p1.price - p2.price, p2.price - p3.price),
        };
        if push1 > 0.0 && push2 > 0.0 {
            total += THREE_PUSHES;
            total += if push2 < push1 {
                DECELERATING
            } else if push2 <= config.near_parallel_ratio * push1 {
                NEAR_PARALLEL
            } else {
                ACCELERATING
            };
        }
    }

    let n = bars.len();
    let Some(signal) = bars.last() else {
        return total;
    };
    if (n - 1).saturating_sub(last.index) <= config.wedge_recency {
        let (opposing, wick) = match kind {
            PivotKind::High => (signal.is_bear(), signal.upper_wick()),
            PivotKind::Low => (signal.is_bull(), signal.lower_wick()),
        };
        if opposing {
            total += OPPOSING_BODY;
            if wick >= config.wedge_wick_ratio * signal.range() {
                total += OPPOSING_WICK;
            }
        }
    }
    total
}

/// Evaluate both sides over the configured window.
pub fn evaluate(bars: &[Bar], config: &StructureConfig) -> (WedgeScores, Option<Wedge>) {
    let highs = wedge_pivots(bars, config.wedge_window, config.pivot_left, PivotKind::High);
    let lows = wedge_pivots(bars, config.wedge_window, config.pivot_left, PivotKind::Low);
    let scores = WedgeScores {
        top: score(&highs, bars, PivotKind::High, config),
        bottom: score(&lows, bars, PivotKind::Low, config),
    };
    let wedge = scores.winner(config.wedge_threshold).and_then(|kind| {
        let (pivots, score) = match kind {
            PivotKind::High => (&highs, scores.top),
            PivotKind::Low => (&lows, scores.bottom),
        };
        pivots.last().map(|p| Wedge {
            kind,
            score,
            extreme: p.price,
        })
    });
    (scores, wedge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pivots(prices: &[f64], last_index: usize) -> Vec<Pivot> {
        let len = prices.len();
        prices
            .iter()
            .enumerate()
            .map(|(k, &price)| Pivot {
                index: last_index + k + 1 - len,
                price,
            })
            .collect()
    }

    fn signal_bars(n: usize, open: f64, high: f64, low: f64, close: f64) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Bar::new(base + chrono::Duration::minutes(5 * i as i64), open, high, low, close))
            .collect()
    }

    #[test]
    fn decelerating_top_with_bear_signal_scores_high() {
        let config = StructureConfig::default();
        let bars = signal_bars(20, 117.0, 117.5, 113.0, 114.0);
        let s = score(&pivots(&[110.0, 115.0, 118.0], 18), &bars, PivotKind::High, &config);
        assert_eq!(s, THREE_PUSHES + DECELERATING + OPPOSING_BODY);
    }

    #[test]
    fn accelerating_top_scores_low() {
        let config = StructureConfig::default();
        let bars = signal_bars(20, 117.0, 117.5, 113.0, 114.0);
        let s = score(&pivots(&[110.0, 120.0, 135.0], 18), &bars, PivotKind::High, &config);
        assert_eq!(s, THREE_PUSHES + ACCELERATING + OPPOSING_BODY);
    }

    #[test]
    fn near_parallel_push_gets_small_bonus() {
        let config = StructureConfig::default();
        let bars = signal_bars(20, 100.0, 101.0, 99.0, 100.5);
        let s = score(&pivots(&[110.0, 115.0, 120.5], 18), &bars, PivotKind::High, &config);
        assert_eq!(s, THREE_PUSHES + NEAR_PARALLEL);
    }

    #[test]
    fn stale_pivot_gets_no_signal_bonus() {
        let config = StructureConfig::default();
        let bars = signal_bars(20, 117.0, 119.0, 113.0, 114.0);
        let s = score(&pivots(&[110.0, 115.0, 118.0], 10), &bars, PivotKind::High, &config);
        assert_eq!(s, THREE_PUSHES + DECELERATING);
    }

    #[test]
    fn opposing_wick_adds_to_body_bonus() {
        let config = StructureConfig::default();
        // Bear body 3, upper wick 2.5 of range 6.
        let bars = signal_bars(20, 117.0, 119.5, 113.5, 114.0);
        let s = score(&pivots(&[110.0, 115.0, 118.0], 18), &bars, PivotKind::High, &config);
        assert_eq!(s, THREE_PUSHES + DECELERATING + OPPOSING_BODY + OPPOSING_WICK);
    }

    #[test]
    fn descending_lows_score_bottom() {
        let config = StructureConfig::default();
        let bars = signal_bars(20, 91.0, 95.0, 90.5, 94.5);
        let s = score(&pivots(&[100.0, 95.0, 92.0], 17), &bars, PivotKind::Low, &config);
        assert_eq!(s, THREE_PUSHES + DECELERATING + OPPOSING_BODY);
    }

    #[test]
    fn ties_never_fire() {
        let tied = WedgeScores { top: 90, bottom: 90 };
        assert_eq!(tied.winner(80), None);
        let top = WedgeScores { top: 90, bottom: 40 };
        assert_eq!(top.winner(80), Some(PivotKind::High));
        let weak = WedgeScores { top: 70, bottom: 0 };
        assert_eq!(weak.winner(80), None);
    }
}
