//! Major-trend-reversal upgrade for second-entry setups.

use super::Setup;
use crate::config::StructureConfig;
use crate::domain::Bar;
use crate::indicators::Volatility;

/// Upgrade H2/L2 when an earlier strong counter-trend bar closed on the far
/// side of the trend average. Other setups pass through unchanged.
pub fn upgrade(setup: Setup, bars: &[Bar], vol: &Volatility, config: &StructureConfig) -> Setup {
    let n = bars.len();
    let (Some(first), Some(last)) = (
        n.checked_sub(config.mtr_window_start),
        n.checked_sub(config.mtr_window_end),
    ) else {
        return setup;
    };
    let floor = config.mtr_body_atr * vol.atr;
    let breached = |bear_bar: bool| {
        (first..=last.min(n - 1)).any(|i| {
            let bar = &bars[i];
            let ta = vol.trend[i];
            if !ta.is_finite() || bar.body() <= floor {
                return false;
            }
            if bear_bar {
                bar.is_bear() && bar.close < ta
            } else {
                bar.is_bull() && bar.close > ta
            }
        })
    };
    match setup {
        Setup::H2 if breached(true) => Setup::MtrBottom,
        Setup::L2 if breached(false) => Setup::MtrTop,
        other => other,
    }
}
