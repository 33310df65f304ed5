//! Ratchet invariant for protective stops.
//!
//! **Core rule:** a stop may tighten, never loosen, even when ATR expands.
//!
//! The engine keeps no state between cycles, so the ratchet is rebuilt each
//! cycle from the stop the broker reports for the position.

use crate::domain::{Price, Side};

/// Stop ratchet for one position.
///
/// - Buy: the stop sits below price and may only rise.
/// - Sell: the stop sits above price and may only fall.
///
/// A reported stop of 0.0 means none is set; any proposal then counts as a
/// tightening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratchet {
    side: Side,
    current: Option<Price>,
    /// Minimum improvement before a move is worth issuing.
    min_step: Price,
}

impl Ratchet {
    pub fn new(side: Side, reported_stop: Price, min_step: Price) -> Self {
        Self {
            side,
            current: (reported_stop > 0.0).then_some(reported_stop),
            min_step: min_step.max(0.0),
        }
    }

    pub fn current(&self) -> Option<Price> {
        self.current
    }

    /// Whether `proposed` is stricter than the current stop by more than the
    /// minimum step.
    ///
    /// # Example
    /// ```
    /// use priceaction_core::domain::Side;
    /// use priceaction_core::management::Ratchet;
    ///
    /// // Short with a stop at 2010: only a lower stop tightens.
    /// let ratchet = Ratchet::new(Side::Sell, 2010.0, 0.5);
    /// assert!(ratchet.is_tighter(2005.0));
    /// assert!(!ratchet.is_tighter(2009.8));
    /// assert!(!ratchet.is_tighter(2015.0));
    /// ```
    pub fn is_tighter(&self, proposed: Price) -> bool {
        match self.current {
            None => true,
            Some(current) => match self.side {
                Side::Buy => proposed > current + self.min_step,
                Side::Sell => proposed < current - self.min_step,
            },
        }
    }

    /// The proposed level if it tightens the stop, else `None`.
    pub fn apply(&self, proposed: Price) -> Option<Price> {
        self.is_tighter(proposed).then_some(proposed)
    }

    /// Level after applying `proposed`: tightenings are taken, loosenings
    /// keep the current stop.
    pub fn ratcheted(&self, proposed: Price) -> Price {
        match (self.current(), self.apply(proposed)) {
            (_, Some(level)) => level,
            (Some(current), None) => current,
            (None, None) => proposed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_tightening_allowed() {
        let ratchet = Ratchet::new(Side::Buy, 95.0, 0.0);
        assert_eq!(ratchet.apply(100.0), Some(100.0));
    }

    #[test]
    fn test_buy_loosening_blocked() {
        let ratchet = Ratchet::new(Side::Buy, 100.0, 0.0);
        assert_eq!(ratchet.apply(90.0), None);
        assert_eq!(ratchet.ratcheted(90.0), 100.0);
    }

    #[test]
    fn test_sell_tightening_moves_down() {
        let ratchet = Ratchet::new(Side::Sell, 105.0, 0.0);
        assert_eq!(ratchet.apply(100.0), Some(100.0));
    }

    #[test]
    fn test_sell_loosening_blocked() {
        let ratchet = Ratchet::new(Side::Sell, 100.0, 0.0);
        assert_eq!(ratchet.apply(110.0), None);
        assert_eq!(ratchet.ratcheted(110.0), 100.0);
    }

    #[test]
    fn test_no_stop_accepts_anything() {
        let ratchet = Ratchet::new(Side::Sell, 0.0, 0.5);
        assert_eq!(ratchet.current(), None);
        assert_eq!(ratchet.apply(2050.0), Some(2050.0));
    }

    #[test]
    fn test_step_filters_small_moves() {
        let ratchet = Ratchet::new(Side::Buy, 100.0, 0.5);
        assert_eq!(ratchet.apply(100.4), None);
        assert_eq!(ratchet.apply(100.5), None);
        assert_eq!(ratchet.apply(100.6), Some(100.6));
    }

    #[test]
    fn test_volatility_trap_scenario() {
        // Price at 110, ATR expands from 5 to 10: a 2-ATR trail proposes 90,
        // which would loosen the 95 stop.
        let ratchet = Ratchet::new(Side::Buy, 95.0, 0.0);
        assert_eq!(ratchet.ratcheted(110.0 - 2.0 * 10.0), 95.0);
    }
}
