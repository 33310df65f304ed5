//! Regime-dependent trailing stop.
//!
//! The trail is looser in strong trends and tighter in ranges and chop.

use crate::config::ManagementConfig;
use crate::domain::{Instrument, Position, Price, Side};
use crate::regime::Regime;

use super::Ratchet;

/// Trail distance in ATR multiples for a regime; `None` when the regime
/// gives no basis for trailing.
pub fn trail_multiple(regime: Regime, config: &ManagementConfig) -> Option<f64> {
    match regime {
        Regime::StrongTrend => Some(config.trail_strong_atr),
        Regime::Channel => Some(config.trail_channel_atr),
        Regime::BreakoutMode => Some(config.trail_breakout_atr),
        Regime::TradingRange | Regime::Barbwire => Some(config.trail_range_atr),
        Regime::Unknown => None,
    }
}

#[derive(Debug, Clone)]
pub struct TrailingStop {
    config: ManagementConfig,
    instrument: Instrument,
}

impl TrailingStop {
    pub fn new(config: &ManagementConfig, instrument: &Instrument) -> Self {
        Self {
            config: config.clone(),
            instrument: instrument.clone(),
        }
    }

    /// New stop level for a profitable position, if the trail tightens it.
    ///
    /// # Formula
    /// ```text
    /// candidate = current_price - side_sign * multiple * ATR
    /// ```
    /// rounded away from price to the tick, then accepted only when it stays
    /// on the protective side of price and beats the reported stop by the
    /// minimum step.
    pub fn propose(&self, position: &Position, atr: f64, regime: Regime) -> Option<Price> {
        if !(position.unrealized_pnl > 0.0) || !(atr > 0.0) {
            return None;
        }
        let multiple = trail_multiple(regime, &self.config)?;
        let side = position.side;
        let raw = position.current_price - side.sign() * multiple * atr;
        let candidate = self.instrument.round_stop(raw, side);

        let protective = match side {
            Side::Buy => candidate < position.current_price,
            Side::Sell => candidate > position.current_price,
        };
        if !protective {
            return None;
        }
        Ratchet::new(side, position.stop, self.config.trail_min_step_atr * atr).apply(candidate)
    }
}
