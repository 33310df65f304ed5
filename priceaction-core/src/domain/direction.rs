use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional bias shared by bar features, regimes and structure setups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bull,
    Bear,
    Neutral,
}

impl Direction {
    /// +1 for bull, -1 for bear, 0 for neutral.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bull => 1.0,
            Direction::Bear => -1.0,
            Direction::Neutral => 0.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Bull => Direction::Bear,
            Direction::Bear => Direction::Bull,
            Direction::Neutral => Direction::Neutral,
        }
    }

    /// Trade side implied by the direction, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Direction::Bull => Some(Side::Buy),
            Direction::Bear => Some(Side::Sell),
            Direction::Neutral => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bull => write!(f, "BULL"),
            Direction::Bear => write!(f, "BEAR"),
            Direction::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Order / position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells. Multiplying a price delta by this gives the
    /// delta in the position's favour.
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Side::Buy => Direction::Bull,
            Side::Sell => Direction::Bear,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_side_mapping() {
        assert_eq!(Direction::Bull.side(), Some(Side::Buy));
        assert_eq!(Direction::Bear.side(), Some(Side::Sell));
        assert_eq!(Direction::Neutral.side(), None);
        assert_eq!(Side::Sell.direction(), Direction::Bear);
    }

    #[test]
    fn side_deserializes_from_wire_names() {
        let side: Side = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(side, Side::Sell);
    }
}
