//! Position management run ahead of any new entry.
//!
//! Order per cycle: partial close, trailing stop, pyramiding guard, exposure
//! ceiling. The first rule that fires ends the cycle.

pub mod ratchet;
pub mod trailing;

pub use ratchet::Ratchet;
pub use trailing::{trail_multiple, TrailingStop};

use tracing::debug;

use crate::config::{EngineConfig, ManagementConfig};
use crate::domain::{MarketSnapshot, Position, Size};
use crate::engine::trace::{Branch, Suppression};
use crate::orders::OrderInstruction;
use crate::regime::Regime;

/// Result of reviewing the open book.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionReview {
    /// A management instruction replaces the entry pipeline.
    Act {
        instruction: OrderInstruction,
        branch: Branch,
    },
    /// New entries are blocked this cycle.
    Block(Suppression),
    /// Nothing to manage; the entry pipeline may run.
    Clear,
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    config: ManagementConfig,
    trailing: TrailingStop,
    max_total_size: Size,
}

impl PositionManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.management.clone(),
            trailing: TrailingStop::new(&config.management, &config.instrument),
            max_total_size: config.sizing.max_total_size,
        }
    }

    pub fn review(&self, snapshot: &MarketSnapshot, atr: f64, regime: Regime) -> PositionReview {
        let positions = &snapshot.positions;
        if let Some(instruction) = self.partial_close(positions, atr) {
            return PositionReview::Act {
                instruction,
                branch: Branch::PartialClose,
            };
        }
        if let Some(instruction) = self.trail(positions, atr, regime) {
            return PositionReview::Act {
                instruction,
                branch: Branch::TrailStop,
            };
        }
        if positions.iter().any(Position::is_losing) {
            return PositionReview::Block(Suppression::Pyramiding);
        }
        if !positions.is_empty() && snapshot.open_size() >= self.max_total_size {
            return PositionReview::Block(Suppression::MaxExposure);
        }
        PositionReview::Clear
    }

    /// Close a fixed slice of the first position that has run far enough in
    /// its favour and was not partially closed before.
    pub fn partial_close(&self, positions: &[Position], atr: f64) -> Option<OrderInstruction> {
        let threshold = self.config.partial_close_atr * atr;
        let pos = positions.iter().find(|p| {
            !p.is_tagged(&self.config.partial_marker)
                && p.size > self.config.partial_close_size
                && p.favorable_move() > threshold
        })?;
        debug!(
            ticket = pos.id,
            moved = pos.favorable_move(),
            threshold,
            "partial close"
        );
        Some(OrderInstruction::close_partial(pos.id, self.config.partial_close_size))
    }

    /// Tighten the stop of the first position the trail improves.
    pub fn trail(&self, positions: &[Position], atr: f64, regime: Regime) -> Option<OrderInstruction> {
        positions.iter().find_map(|p| {
            self.trailing.propose(p, atr, regime).map(|stop| {
                debug!(ticket = p.id, old = p.stop, new = stop, %regime, "trail stop");
                OrderInstruction::modify_stop(p.id, stop, p.target)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewsEvent, Side};
    use crate::orders::OrderAction;

    fn position(id: u64, side: Side, size: f64, open: f64, current: f64, stop: f64) -> Position {
        let pnl = (current - open) * side.sign() * size * 100.0;
        Position {
            id,
            side,
            size,
            open_price: open,
            current_price: current,
            stop,
            target: 0.0,
            unrealized_pnl: pnl,
            tag: "PA".into(),
        }
    }

    fn snapshot(positions: Vec<Position>) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "XAUUSD".into(),
            server_hour: 10,
            server_minute: 0,
            bid: 2000.0,
            ask: 2000.2,
            spread: 20,
            account_equity: 10_000.0,
            margin_level: 0.0,
            bars: Vec::new(),
            htf_bars: Vec::new(),
            news: NewsEvent::default(),
            positions,
            last_closed_trade: None,
        }
    }

    fn manager() -> PositionManager {
        PositionManager::new(&EngineConfig::default())
    }

    #[test]
    fn empty_book_is_clear() {
        assert_eq!(manager().review(&snapshot(vec![]), 5.0, Regime::Channel), PositionReview::Clear);
    }

    #[test]
    fn partial_close_after_one_atr() {
        let snap = snapshot(vec![position(9, Side::Buy, 0.02, 2000.0, 2006.0, 1995.0)]);
        match manager().review(&snap, 5.0, Regime::Channel) {
            PositionReview::Act { instruction, branch } => {
                assert_eq!(branch, Branch::PartialClose);
                assert_eq!(instruction.action, OrderAction::ClosePartial);
                assert_eq!(instruction.ticket, 9);
                assert_eq!(instruction.size, 0.01);
            }
            other => panic!("expected partial close, got {other:?}"),
        }
    }

    #[test]
    fn partial_close_is_idempotent_via_tag() {
        let mut pos = position(9, Side::Buy, 0.02, 2000.0, 2006.0, 1995.0);
        pos.tag = "PA|PARTIAL".into();
        assert!(manager().partial_close(&[pos], 5.0).is_none());
    }

    #[test]
    fn partial_close_needs_size_above_slice() {
        let pos = position(9, Side::Buy, 0.01, 2000.0, 2006.0, 1995.0);
        assert!(manager().partial_close(&[pos], 5.0).is_none());
    }

    #[test]
    fn trailing_follows_partial_close() {
        let mut pos = position(3, Side::Sell, 0.01, 2000.0, 1990.0, 2004.0);
        pos.target = 1970.0;
        let snap = snapshot(vec![pos]);
        match manager().review(&snap, 5.0, Regime::Channel) {
            PositionReview::Act { instruction, branch } => {
                assert_eq!(branch, Branch::TrailStop);
                assert_eq!(instruction.action, OrderAction::ModifySl);
                assert_eq!(instruction.ticket, 3);
                assert!((instruction.stop_price - 1997.5).abs() < 1e-6);
                assert_eq!(instruction.target_price, 1970.0);
            }
            other => panic!("expected trail, got {other:?}"),
        }
    }

    #[test]
    fn losing_position_blocks_entries() {
        let snap = snapshot(vec![position(4, Side::Buy, 0.01, 2000.0, 1998.0, 1990.0)]);
        assert_eq!(
            manager().review(&snap, 5.0, Regime::Channel),
            PositionReview::Block(Suppression::Pyramiding)
        );
    }

    #[test]
    fn exposure_ceiling_blocks_entries() {
        // Two winners whose stops are already tight: nothing to manage.
        let snap = snapshot(vec![
            position(1, Side::Buy, 0.01, 2000.0, 2002.0, 2001.0),
            position(2, Side::Buy, 0.03, 2000.0, 2002.0, 2001.0),
        ]);
        assert_eq!(
            manager().review(&snap, 5.0, Regime::Channel),
            PositionReview::Block(Suppression::MaxExposure)
        );
    }
}
