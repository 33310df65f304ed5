//! Safety gate: hard account, clock, spread and news limits.
//!
//! The gate runs before any pattern work. A denial short-circuits the cycle to
//! HOLD, except that a drawdown breach can flatten the book (see
//! [`SafetyGate::force_close`]).

pub mod guards;

pub use guards::{
    reference_hour, CooldownGuard, Denial, DenialReason, DrawdownGuard, GateContext, MarginGuard,
    NewsGuard, SafetyGuard, SessionGuard, SpreadGuard,
};

use tracing::warn;

use crate::config::EngineConfig;
use crate::domain::MarketSnapshot;
use crate::orders::OrderInstruction;

/// Ordered set of guards; the first denial wins.
pub struct SafetyGate {
    guards: Vec<Box<dyn SafetyGuard>>,
    force_close_on_drawdown: bool,
}

impl SafetyGate {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            guards: default_guards(config),
            force_close_on_drawdown: config.safety.force_close_on_drawdown,
        }
    }

    /// Custom guard list, mostly for tests.
    pub fn with_guards(guards: Vec<Box<dyn SafetyGuard>>) -> Self {
        Self {
            guards,
            force_close_on_drawdown: false,
        }
    }

    pub fn check(&self, snapshot: &MarketSnapshot, atr: Option<f64>) -> Result<(), Denial> {
        let ctx = GateContext { snapshot, atr };
        for guard in &self.guards {
            if let Some(denial) = guard.check(&ctx) {
                warn!(
                    guard = guard.name(),
                    reason = %denial.reason,
                    context = %denial.context,
                    "trading denied"
                );
                return Err(denial);
            }
        }
        Ok(())
    }

    /// Close instruction for the first open position when the drawdown
    /// breaker fired and flattening is enabled.
    pub fn force_close(&self, snapshot: &MarketSnapshot, denial: &Denial) -> Option<OrderInstruction> {
        if !self.force_close_on_drawdown || denial.reason != DenialReason::Drawdown {
            return None;
        }
        snapshot
            .positions
            .first()
            .map(|p| OrderInstruction::close_position(p.id, p.size))
    }
}

/// Default guard set in evaluation order.
pub fn default_guards(config: &EngineConfig) -> Vec<Box<dyn SafetyGuard>> {
    let s = &config.safety;
    vec![
        Box::new(DrawdownGuard {
            reference_balance: s.reference_balance,
            max_drawdown: s.max_drawdown,
        }),
        Box::new(MarginGuard {
            min_margin_level: s.min_margin_level,
        }),
        Box::new(SessionGuard {
            utc_offset_hours: s.utc_offset_hours,
            rollover: s.rollover,
            no_trade_windows: s.no_trade_windows.clone(),
        }),
        Box::new(SpreadGuard {
            limit: s.spread.clone(),
            instrument: config.instrument.clone(),
        }),
        Box::new(NewsGuard {
            min_impact: s.news_min_impact,
            padding_minutes: s.news_padding_minutes,
        }),
        Box::new(CooldownGuard {
            minutes: s.loss_cooldown_minutes,
        }),
    ]
}
