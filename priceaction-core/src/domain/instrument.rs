use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Price, Side, Size};

/// Tick rounding policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TickPolicy {
    /// Round to nearest tick
    RoundNearest,
    /// Round down
    RoundDown,
    /// Round up
    RoundUp,
}

/// Instrument metadata: price tick, size increment and contract value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Instrument {
    pub symbol: String,
    /// Minimum price increment.
    pub tick_size: f64,
    /// Price value of one spread "point" as quoted by the broker.
    pub point_size: f64,
    /// Minimum size increment.
    pub size_step: f64,
    /// Account-currency value of a 1.0 price move on 1.0 size.
    pub value_per_point: f64,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            symbol: "XAUUSD".into(),
            tick_size: 0.01,
            point_size: 0.01,
            size_step: 0.01,
            value_per_point: 100.0,
        }
    }
}

impl Instrument {
    /// Round price according to policy. Directed rounding tolerates float
    /// noise so a price already on the grid stays put.
    pub fn round_price(&self, price: Price, policy: TickPolicy) -> Price {
        let ticks = price / self.tick_size;
        let rounded_ticks = match policy {
            TickPolicy::RoundNearest => ticks.round(),
            TickPolicy::RoundDown => (ticks + 1e-9).floor(),
            TickPolicy::RoundUp => (ticks - 1e-9).ceil(),
        };
        rounded_ticks * self.tick_size
    }

    /// Side-aware rounding for protective stops: a buy's stop rounds down and a
    /// sell's stop rounds up, so rounding never tightens the risk distance.
    pub fn round_stop(&self, price: Price, side: Side) -> Price {
        let policy = match side {
            Side::Buy => TickPolicy::RoundDown,
            Side::Sell => TickPolicy::RoundUp,
        };
        self.round_price(price, policy)
    }

    /// Floor a size to the size step. A small epsilon absorbs float noise
    /// such as 0.03 / 0.01 = 2.9999999999999996.
    pub fn floor_size(&self, size: Size) -> Size {
        let steps = (size / self.size_step + 1e-9).floor();
        steps * self.size_step
    }

    /// Convert a price distance to broker points.
    pub fn to_points(&self, distance: Price) -> f64 {
        distance / self.point_size
    }

    pub fn validate(&self) -> Result<(), InstrumentError> {
        positive("tick_size", self.tick_size)?;
        positive("point_size", self.point_size)?;
        positive("size_step", self.size_step)?;
        positive("value_per_point", self.value_per_point)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), InstrumentError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(InstrumentError::NonPositive { field, value })
    }
}

#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("instrument {field} must be > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_size_rounding() {
        let inst = Instrument::default();
        assert!((inst.round_price(2030.126, TickPolicy::RoundNearest) - 2030.13).abs() < 1e-9);
        assert!((inst.round_price(2030.124, TickPolicy::RoundNearest) - 2030.12).abs() < 1e-9);
    }

    #[test]
    fn test_side_aware_stop_rounding() {
        let inst = Instrument {
            tick_size: 0.25,
            ..Instrument::default()
        };
        assert_eq!(inst.round_stop(4500.10, Side::Buy), 4500.00);
        assert_eq!(inst.round_stop(4500.10, Side::Sell), 4500.25);
    }

    #[test]
    fn test_on_grid_stop_is_unchanged() {
        let inst = Instrument::default();
        assert!((inst.round_stop(1994.75, Side::Buy) - 1994.75).abs() < 1e-9);
        assert!((inst.round_stop(2005.35, Side::Sell) - 2005.35).abs() < 1e-9);
    }

    #[test]
    fn test_floor_size_absorbs_float_noise() {
        let inst = Instrument::default();
        assert!((inst.floor_size(0.03) - 0.03).abs() < 1e-12);
        assert!((inst.floor_size(0.0299) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let inst = Instrument {
            tick_size: 0.0,
            ..Instrument::default()
        };
        assert!(inst.validate().is_err());
        assert!(Instrument::default().validate().is_ok());
    }
}
