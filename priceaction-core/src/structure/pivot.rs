//! Swing pivots.
//!
//! Two tests are provided: the asymmetric wedge test, which lets a sharp
//! reversal bar confirm a pivot after one bar, and the symmetric swing test
//! used to frame trading ranges.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    fn price(self, bar: &Bar) -> f64 {
        match self {
            PivotKind::High => bar.high,
            PivotKind::Low => bar.low,
        }
    }

    /// Whether `a` is strictly more extreme than `b` in this pivot's direction.
    fn dominates(self, a: f64, b: f64) -> bool {
        match self {
            PivotKind::High => a > b,
            PivotKind::Low => a < b,
        }
    }

    /// A bar that already turns away from the pivot: opposite-coloured, or
    /// with a wick on the pivot side longer than its body.
    fn is_reversal_bar(self, bar: &Bar) -> bool {
        match self {
            PivotKind::High => bar.is_bear() || bar.upper_wick() > bar.body(),
            PivotKind::Low => bar.is_bull() || bar.lower_wick() > bar.body(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub index: usize,
    pub price: f64,
}

/// Asymmetric pivot test: strict dominance over `left` bars on the left; on
/// the right one bar if it is a reversal bar, otherwise two.
pub fn is_wedge_pivot(bars: &[Bar], i: usize, left: usize, kind: PivotKind) -> bool {
    if i < left || i + 1 >= bars.len() {
        return false;
    }
    let price = kind.price(&bars[i]);
    if !bars[i - left..i].iter().all(|b| kind.dominates(price, kind.price(b))) {
        return false;
    }
    let right = if kind.is_reversal_bar(&bars[i + 1]) { 1 } else { 2 };
    if i + right >= bars.len() {
        return false;
    }
    bars[i + 1..=i + right]
        .iter()
        .all(|b| kind.dominates(price, kind.price(b)))
}

/// Symmetric swing test with `strength` bars on each side.
pub fn is_swing_pivot(bars: &[Bar], i: usize, strength: usize, kind: PivotKind) -> bool {
    if i < strength || i + strength >= bars.len() {
        return false;
    }
    let price = kind.price(&bars[i]);
    bars[i - strength..=i + strength]
        .iter()
        .enumerate()
        .all(|(k, b)| k == strength || kind.dominates(price, kind.price(b)))
}

/// Wedge pivots inside the trailing `window`, oldest first.
pub fn wedge_pivots(bars: &[Bar], window: usize, left: usize, kind: PivotKind) -> Vec<Pivot> {
    let start = bars.len().saturating_sub(window);
    (start..bars.len())
        .filter(|&i| is_wedge_pivot(bars, i, left, kind))
        .map(|i| Pivot {
            index: i,
            price: kind.price(&bars[i]),
        })
        .collect()
}

/// Most recent swing pivot inside the trailing `window`.
pub fn last_swing_pivot(bars: &[Bar], window: usize, strength: usize, kind: PivotKind) -> Option<Pivot> {
    let start = bars.len().saturating_sub(window);
    (start..bars.len())
        .rev()
        .find(|&i| is_swing_pivot(bars, i, strength, kind))
        .map(|i| Pivot {
            index: i,
            price: kind.price(&bars[i]),
        })
}
