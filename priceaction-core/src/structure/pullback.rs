//! Trend-pullback counting (H1/H2, L1/L2), micro double tops/bottoms and
//! the reset override.

use super::Setup;
use crate::config::StructureConfig;
use crate::domain::{Bar, Direction};
use crate::indicators::Volatility;
use crate::regime::factors::{extent, tail};

/// A structure result before priority resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub setup: Setup,
    /// Price the protective stop should sit beyond.
    pub anchor: f64,
}

/// Trend extreme of a bar: the high in a bull trend, the low in a bear trend.
fn push(bar: &Bar, dir: Direction) -> f64 {
    if dir == Direction::Bear {
        bar.low
    } else {
        bar.high
    }
}

/// Counter-trend extreme of a bar.
fn pull(bar: &Bar, dir: Direction) -> f64 {
    if dir == Direction::Bear {
        bar.high
    } else {
        bar.low
    }
}

fn with_trend(bar: &Bar, dir: Direction) -> bool {
    match dir {
        Direction::Bull => bar.is_bull(),
        Direction::Bear => bar.is_bear(),
        Direction::Neutral => false,
    }
}

/// H1/H2 (bull) or L1/L2 (bear) when the latest bar breaks the prior bar's
/// trend extreme with conviction.
pub fn pullback_setup(
    bars: &[Bar],
    vol: &Volatility,
    dir: Direction,
    config: &StructureConfig,
) -> Option<Candidate> {
    let n = bars.len();
    if n < config.pullback_window + 2 || dir == Direction::Neutral {
        return None;
    }
    let s = dir.sign();
    let cur = &bars[n - 1];
    let prev = &bars[n - 2];

    let breaks = (push(cur, dir) - push(prev, dir)) * s > 0.0;
    let conviction = with_trend(cur, dir) || (cur.close - push(prev, dir)) * s > 0.0;
    if !(breaks && conviction) {
        return None;
    }

    let atr = vol.atr;
    let window_start = n - 1 - config.pullback_window;

    // Deepest excursion against the trend relative to the trend average.
    let depth = (window_start..n - 1)
        .filter(|&i| vol.trend[i].is_finite())
        .map(|i| (pull(&bars[i], dir) - vol.trend[i]) * s)
        .fold(f64::INFINITY, f64::min);

    // The pullback starts at the last trend extreme before the signal bar.
    let swing = (window_start..n - 1)
        .max_by(|&a, &b| (push(&bars[a], dir) * s).total_cmp(&(push(&bars[b], dir) * s)))
        .unwrap_or(window_start);
    let anchor = bars[swing..n]
        .iter()
        .map(|b| pull(b, dir) * s)
        .fold(f64::INFINITY, f64::min)
        * s;

    let second = depth < -config.depth_margin_atr * atr;
    let setup = match (dir, second) {
        (Direction::Bull, true) => Setup::H2,
        (Direction::Bear, true) => Setup::L2,
        _ => first_entry(cur, vol, dir, config),
    };
    Some(Candidate { setup, anchor })
}

/// Grade a first-entry setup through the magnet and slope filters.
fn first_entry(cur: &Bar, vol: &Volatility, dir: Direction, config: &StructureConfig) -> Setup {
    let bull = dir == Direction::Bull;
    let stretch = (push(cur, dir) - vol.latest_trend()) * dir.sign();
    if stretch > config.magnet_atr * vol.atr {
        return if bull { Setup::IgnoreH1 } else { Setup::IgnoreL1 };
    }
    let local_slope = vol.in_atr((vol.trend_back(0) - vol.trend_back(1)).abs());
    if !(local_slope >= config.weak_slope_atr) {
        return if bull { Setup::WeakH1 } else { Setup::WeakL1 };
    }
    if bull {
        Setup::H1
    } else {
        Setup::L1
    }
}

/// Micro double bottom (bull) or top (bear): two matching counter-trend
/// extremes or an inside bar, closed strongly in the trend direction.
pub fn micro_setup(
    bars: &[Bar],
    atr: f64,
    dir: Direction,
    close_zone: f64,
    config: &StructureConfig,
) -> Option<Candidate> {
    let n = bars.len();
    if n < 2 || dir == Direction::Neutral {
        return None;
    }
    if extent(tail(bars, config.micro_window)) > config.micro_max_range_atr * atr {
        return None;
    }
    let cur = &bars[n - 1];
    let prev = &bars[n - 2];

    let matched = (pull(cur, dir) - pull(prev, dir)).abs() <= config.micro_tolerance_atr * atr;
    let inside = cur.high <= prev.high && cur.low >= prev.low;
    let strong_close = match dir {
        Direction::Bull => cur.close_position() >= 1.0 - close_zone,
        _ => cur.close_position() <= close_zone,
    };
    if !((matched || inside) && with_trend(cur, dir) && strong_close) {
        return None;
    }

    let s = dir.sign();
    let anchor = (pull(cur, dir) * s).min(pull(prev, dir) * s) * s;
    let setup = if dir == Direction::Bull {
        Setup::MicroDoubleBottom
    } else {
        Setup::MicroDoubleTop
    };
    Some(Candidate { setup, anchor })
}

/// A large counter-trend body in the recent window resets the count.
pub fn reset_triggered(bars: &[Bar], atr: f64, dir: Direction, config: &StructureConfig) -> bool {
    let against = dir.opposite();
    tail(bars, config.reset_window)
        .iter()
        .any(|b| with_trend(b, against) && b.body() > config.reset_body_atr * atr)
}
