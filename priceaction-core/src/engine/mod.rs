//! Decision orchestrator: one snapshot in, one instruction out.
//!
//! Per cycle:
//!
//! 1. Volatility estimate (ATR + trend average)
//! 2. Safety gate, with force-close on a drawdown breach
//! 3. History floor
//! 4. Regime classification
//! 5. Position management (partial close, trail, entry guards)
//! 6. Structure count
//! 7. Order construction
//!
//! The engine holds only immutable configuration, so one instance can serve
//! any number of independent cycles.

pub mod trace;

pub use trace::{Branch, DecisionTrace, Suppression};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::domain::{Direction, MarketSnapshot};
use crate::error::ConfigError;
use crate::features::BarFeatureExtractor;
use crate::fingerprint::ConfigHash;
use crate::indicators::VolatilityEstimator;
use crate::management::{PositionManager, PositionReview};
use crate::orders::{OrderBuilder, OrderContext, OrderInstruction};
use crate::regime::{Regime, RegimeClassifier, RegimeReading};
use crate::safety::SafetyGate;
use crate::structure::{Setup, StructureCounter};

/// Final instruction plus the trace that explains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub instruction: OrderInstruction,
    pub trace: DecisionTrace,
}

pub struct DecisionEngine {
    volatility: VolatilityEstimator,
    features: BarFeatureExtractor,
    safety: SafetyGate,
    regime: RegimeClassifier,
    structure: StructureCounter,
    orders: OrderBuilder,
    management: PositionManager,
    fingerprint: ConfigHash,
}

impl DecisionEngine {
    /// Build from a configuration assumed valid.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            volatility: VolatilityEstimator::new(&config.volatility),
            features: BarFeatureExtractor::new(&config.bars),
            safety: SafetyGate::new(config),
            regime: RegimeClassifier::new(config),
            structure: StructureCounter::new(config),
            orders: OrderBuilder::new(config),
            management: PositionManager::new(config),
            fingerprint: config.fingerprint(),
        }
    }

    /// Validate, then build.
    pub fn try_new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.fingerprint
    }

    /// Run one decision cycle. Never fails: every degenerate input ends in a
    /// HOLD whose reason says why.
    pub fn decide(&self, snapshot: &MarketSnapshot) -> Decision {
        let bars = &snapshot.bars;
        let estimate = self.volatility.estimate(bars);
        let atr = estimate.as_ref().ok().map(|v| v.atr);

        let mut trace = DecisionTrace {
            regime: Regime::Unknown,
            direction: Direction::Neutral,
            setup: Setup::None,
            branch: Branch::Gate,
            suppression: None,
            atr,
            signal_bar: None,
            config: self.fingerprint.clone(),
        };

        if let Err(denial) = self.safety.check(snapshot, atr) {
            trace.suppression = Some(Suppression::Safety(denial.reason));
            return match self.safety.force_close(snapshot, &denial) {
                Some(close) => {
                    trace.branch = Branch::ForceClose;
                    self.emit(close, trace)
                }
                None => self.emit(OrderInstruction::hold(), trace),
            };
        }

        let vol = match estimate {
            Ok(vol) => vol,
            Err(err) => {
                debug!(error = %err, "holding");
                trace.suppression = Some(Suppression::InsufficientData);
                return self.emit(OrderInstruction::hold(), trace);
            }
        };

        let reading: RegimeReading = self.regime.classify(bars, &vol, &snapshot.htf_bars);
        trace.regime = reading.regime;
        trace.direction = reading.direction;
        trace.signal_bar = bars.last().map(|bar| {
            let prev = bars.len().checked_sub(2).map(|i| &bars[i]);
            self.features.extract(bar, prev, vol.atr)
        });

        match self.management.review(snapshot, vol.atr, reading.regime) {
            PositionReview::Act { instruction, branch } => {
                trace.branch = branch;
                return self.emit(instruction, trace);
            }
            PositionReview::Block(suppression) => {
                trace.branch = Branch::EntryGuard;
                trace.suppression = Some(suppression);
                return self.emit(OrderInstruction::hold(), trace);
            }
            PositionReview::Clear => {}
        }

        let structure = self.structure.analyze(bars, &vol, reading.direction);
        trace.setup = structure.setup;

        let outcome = self.orders.build(&OrderContext {
            bars,
            vol: &vol,
            regime: &reading,
            structure: &structure,
        });
        trace.branch = outcome.branch;
        trace.suppression = outcome.suppression;
        self.emit(outcome.instruction, trace)
    }

    fn emit(&self, instruction: OrderInstruction, trace: DecisionTrace) -> Decision {
        let instruction = instruction.with_reason(trace.reason());
        info!(
            action = %instruction.action,
            regime = %trace.regime,
            setup = %trace.setup,
            branch = %trace.branch,
            suppression = ?trace.suppression,
            atr = ?trace.atr,
            config = trace.config.short(),
            "decision"
        );
        Decision { instruction, trace }
    }
}
