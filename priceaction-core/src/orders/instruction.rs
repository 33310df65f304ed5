//! Order instruction emitted by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Price, Side, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Hold,
    PlaceBuyStop,
    PlaceSellStop,
    PlaceBuyLimit,
    PlaceSellLimit,
    ClosePartial,
    ClosePos,
    ModifySl,
}

impl OrderAction {
    /// Stop-entry action for a side.
    pub fn stop_entry(side: Side) -> Self {
        match side {
            Side::Buy => OrderAction::PlaceBuyStop,
            Side::Sell => OrderAction::PlaceSellStop,
        }
    }

    /// Limit-entry action for a side.
    pub fn limit_entry(side: Side) -> Self {
        match side {
            Side::Buy => OrderAction::PlaceBuyLimit,
            Side::Sell => OrderAction::PlaceSellLimit,
        }
    }

    /// Side of a new-entry action; `None` for hold and position management.
    pub fn entry_side(self) -> Option<Side> {
        match self {
            OrderAction::PlaceBuyStop | OrderAction::PlaceBuyLimit => Some(Side::Buy),
            OrderAction::PlaceSellStop | OrderAction::PlaceSellLimit => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn is_entry(self) -> bool {
        self.entry_side().is_some()
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderAction::Hold => "HOLD",
            OrderAction::PlaceBuyStop => "PLACE_BUY_STOP",
            OrderAction::PlaceSellStop => "PLACE_SELL_STOP",
            OrderAction::PlaceBuyLimit => "PLACE_BUY_LIMIT",
            OrderAction::PlaceSellLimit => "PLACE_SELL_LIMIT",
            OrderAction::ClosePartial => "CLOSE_PARTIAL",
            OrderAction::ClosePos => "CLOSE_POS",
            OrderAction::ModifySl => "MODIFY_SL",
        };
        f.write_str(s)
    }
}

/// One instruction for the execution collaborator. Prices of 0.0 mean
/// "not applicable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInstruction {
    pub action: OrderAction,
    /// Position addressed by management actions, 0 for new entries and holds.
    pub ticket: u64,
    #[serde(rename = "lot")]
    pub size: Size,
    pub entry_price: Price,
    #[serde(rename = "sl")]
    pub stop_price: Price,
    #[serde(rename = "tp")]
    pub target_price: Price,
    pub reason: String,
}

impl OrderInstruction {
    pub fn hold() -> Self {
        Self {
            action: OrderAction::Hold,
            ticket: 0,
            size: 0.0,
            entry_price: 0.0,
            stop_price: 0.0,
            target_price: 0.0,
            reason: String::new(),
        }
    }

    pub fn entry(action: OrderAction, size: Size, entry: Price, stop: Price, target: Price) -> Self {
        Self {
            action,
            size,
            entry_price: entry,
            stop_price: stop,
            target_price: target,
            ..Self::hold()
        }
    }

    pub fn close_partial(ticket: u64, size: Size) -> Self {
        Self {
            action: OrderAction::ClosePartial,
            ticket,
            size,
            ..Self::hold()
        }
    }

    pub fn close_position(ticket: u64, size: Size) -> Self {
        Self {
            action: OrderAction::ClosePos,
            ticket,
            size,
            ..Self::hold()
        }
    }

    /// Move the protective stop; the existing target is carried unchanged.
    pub fn modify_stop(ticket: u64, stop: Price, target: Price) -> Self {
        Self {
            action: OrderAction::ModifySl,
            ticket,
            stop_price: stop,
            target_price: target,
            ..Self::hold()
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == OrderAction::Hold
    }

    pub fn with_reason(mut self, reason: String) -> Self {
        self.reason = reason;
        self
    }

    /// Entry-to-stop distance; zero for non-entries.
    pub fn risk(&self) -> Price {
        if self.action.is_entry() {
            (self.entry_price - self.stop_price).abs()
        } else {
            0.0
        }
    }
}
