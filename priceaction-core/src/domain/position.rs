use serde::{Deserialize, Serialize};

use super::{Price, Side, Size};

/// An open position as reported by the execution collaborator.
///
/// Read-only to the engine: it only decides whether to partially close, trail
/// the stop, or block new entries. Wire aliases follow the terminal's naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(alias = "ticket")]
    pub id: u64,
    #[serde(alias = "type")]
    pub side: Side,
    #[serde(alias = "volume")]
    pub size: Size,
    pub open_price: Price,
    pub current_price: Price,
    /// Protective stop, 0.0 when none is set.
    #[serde(alias = "sl", default)]
    pub stop: Price,
    /// Take-profit, 0.0 when none is set.
    #[serde(alias = "tp", default)]
    pub target: Price,
    #[serde(alias = "profit", default)]
    pub unrealized_pnl: f64,
    #[serde(alias = "comment", default)]
    pub tag: String,
}

impl Position {
    /// Price distance moved in the position's favour (negative when adverse).
    pub fn favorable_move(&self) -> Price {
        (self.current_price - self.open_price) * self.side.sign()
    }

    pub fn is_losing(&self) -> bool {
        self.unrealized_pnl < 0.0
    }

    pub fn has_stop(&self) -> bool {
        self.stop > 0.0
    }

    /// Whether the tag carries the given marker (e.g. a prior partial close).
    pub fn is_tagged(&self, marker: &str) -> bool {
        self.tag.contains(marker)
    }
}
