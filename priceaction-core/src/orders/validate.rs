//! Final geometry gate for entry instructions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{OrderAction, OrderInstruction};
use crate::domain::Side;

/// Why an entry instruction cannot be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GeometryError {
    #[error("prices must be finite and positive")]
    NonPositivePrice,
    #[error("size must be positive")]
    NonPositiveSize,
    #[error("buy stop must be below entry")]
    StopNotBelowEntry,
    #[error("sell stop must be above entry")]
    StopNotAboveEntry,
    #[error("buy target must be above entry")]
    TargetNotAboveEntry,
    #[error("sell target must be below entry")]
    TargetNotBelowEntry,
}

/// Check side consistency of stop and target. Non-entry actions pass.
pub fn check(instr: &OrderInstruction) -> Result<(), GeometryError> {
    let Some(side) = instr.action.entry_side() else {
        return Ok(());
    };
    let (entry, stop, target) = (instr.entry_price, instr.stop_price, instr.target_price);
    if !(entry.is_finite() && entry > 0.0 && stop.is_finite() && stop > 0.0 && target.is_finite()) {
        return Err(GeometryError::NonPositivePrice);
    }
    if !(instr.size > 0.0) {
        return Err(GeometryError::NonPositiveSize);
    }
    match side {
        Side::Buy => {
            if stop >= entry {
                return Err(GeometryError::StopNotBelowEntry);
            }
            if target != 0.0 && target <= entry {
                return Err(GeometryError::TargetNotAboveEntry);
            }
        }
        Side::Sell => {
            if stop <= entry {
                return Err(GeometryError::StopNotAboveEntry);
            }
            if target != 0.0 && target >= entry {
                return Err(GeometryError::TargetNotBelowEntry);
            }
        }
    }
    Ok(())
}

/// HOLD and management actions are always valid.
pub fn is_valid(instr: &OrderInstruction) -> bool {
    instr.action == OrderAction::Hold || check(instr).is_ok()
}
