//! OrderBuilder: regime-keyed entry construction.
//!
//! Each branch proposes raw price levels; [`OrderBuilder::build`] then sizes,
//! rounds to the instrument tick and runs the geometry gate. A branch that
//! declines to trade returns the [`Suppression`] explaining why.

use tracing::{debug, warn};

use super::sizing::RiskSizer;
use super::{validate, OrderAction, OrderInstruction};
use crate::config::{EngineConfig, OrderConfig};
use crate::domain::{Bar, Direction, Instrument, Price, Side, Size, TickPolicy};
use crate::engine::trace::{Branch, Suppression};
use crate::features::BarFeatureExtractor;
use crate::indicators::Volatility;
use crate::regime::factors::tail;
use crate::regime::{Regime, RegimeReading};
use crate::structure::pivot::{last_swing_pivot, PivotKind};
use crate::structure::StructureReport;

/// Inputs for one build.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    pub bars: &'a [Bar],
    pub vol: &'a Volatility,
    pub regime: &'a RegimeReading,
    pub structure: &'a StructureReport,
}

/// Instruction plus the branch that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderOutcome {
    pub instruction: OrderInstruction,
    pub branch: Branch,
    pub suppression: Option<Suppression>,
}

impl OrderOutcome {
    pub fn hold(branch: Branch, suppression: Suppression) -> Self {
        Self {
            instruction: OrderInstruction::hold(),
            branch,
            suppression: Some(suppression),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Stop,
    Limit,
}

/// Raw levels proposed by a branch.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Plan {
    side: Side,
    kind: EntryKind,
    entry: Price,
    stop: Price,
    /// 0.0 for no target.
    target: Price,
    /// Overrides risk-based sizing.
    fixed_size: Option<Size>,
}

impl Plan {
    /// Stop entry beyond `extreme`, protective stop beyond `anchor`, target at
    /// `rr` times the risk (0 for none).
    fn stop_entry(side: Side, extreme: Price, anchor: Price, buffer: Price, rr: f64) -> Self {
        let s = side.sign();
        let entry = extreme + s * buffer;
        let stop = anchor - s * buffer;
        let target = if rr > 0.0 {
            entry + rr * (entry - stop)
        } else {
            0.0
        };
        Self {
            side,
            kind: EntryKind::Stop,
            entry,
            stop,
            target,
            fixed_size: None,
        }
    }

    fn risk(&self) -> Price {
        (self.entry - self.stop) * self.side.sign()
    }
}

/// Trade-direction extreme of a bar.
fn extreme(bar: &Bar, side: Side) -> Price {
    match side {
        Side::Buy => bar.high,
        Side::Sell => bar.low,
    }
}

/// Protective-side extreme of a bar.
fn opposite_extreme(bar: &Bar, side: Side) -> Price {
    match side {
        Side::Buy => bar.low,
        Side::Sell => bar.high,
    }
}

#[derive(Debug, Clone)]
pub struct OrderBuilder {
    config: OrderConfig,
    climax_body_atr: f64,
    instrument: Instrument,
    sizer: RiskSizer,
    features: BarFeatureExtractor,
}

impl OrderBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.orders.clone(),
            climax_body_atr: config.regime.climax_body_atr,
            instrument: config.instrument.clone(),
            sizer: RiskSizer::new(&config.sizing, &config.instrument),
            features: BarFeatureExtractor::new(&config.bars),
        }
    }

    /// Adaptive entry buffer: at least the minimum tick distance.
    pub fn buffer(&self, atr: f64) -> Price {
        self.config.min_buffer.max(self.config.buffer_atr * atr)
    }

    pub fn build(&self, ctx: &OrderContext<'_>) -> OrderOutcome {
        if ctx.bars.len() < 2 {
            return OrderOutcome::hold(Branch::Idle, Suppression::InsufficientData);
        }
        let buffer = self.buffer(ctx.vol.atr);
        let setup = ctx.structure.setup;

        let (branch, plan) = match ctx.regime.regime {
            Regime::Barbwire => return OrderOutcome::hold(Branch::Barbwire, Suppression::Chop),
            Regime::Unknown => return OrderOutcome::hold(Branch::Idle, Suppression::InsufficientData),
            _ if setup.is_reversal() => (Branch::Reversal, self.reversal(ctx, buffer)),
            Regime::StrongTrend => self.strong_trend(ctx, buffer),
            Regime::Channel => (Branch::Channel, self.channel(ctx, buffer)),
            Regime::TradingRange => (Branch::TradingRange, self.trading_range(ctx, buffer)),
            Regime::BreakoutMode => (Branch::Breakout, self.breakout(ctx, buffer)),
        };

        match plan {
            Ok(plan) => self.finish(branch, plan),
            Err(suppression) => {
                debug!(%branch, %suppression, "branch held");
                OrderOutcome::hold(branch, suppression)
            }
        }
    }

    /// Size, round and validate a plan.
    fn finish(&self, branch: Branch, plan: Plan) -> OrderOutcome {
        let entry = self.instrument.round_price(plan.entry, TickPolicy::RoundNearest);
        let stop = self.instrument.round_stop(plan.stop, plan.side);
        let target = if plan.target == 0.0 {
            0.0
        } else {
            self.instrument.round_price(plan.target, TickPolicy::RoundNearest)
        };
        let size = match plan.fixed_size {
            Some(fixed) => self.sizer.bound(fixed),
            None => self.sizer.size(entry, stop),
        };
        let action = match plan.kind {
            EntryKind::Stop => OrderAction::stop_entry(plan.side),
            EntryKind::Limit => OrderAction::limit_entry(plan.side),
        };
        let instruction = OrderInstruction::entry(action, size, entry, stop, target);

        match validate::check(&instruction) {
            Ok(()) => OrderOutcome {
                instruction,
                branch,
                suppression: None,
            },
            Err(err) => {
                warn!(%branch, entry, stop, target, error = %err, "order geometry rejected");
                OrderOutcome::hold(branch, Suppression::InvalidGeometry(err))
            }
        }
    }

    fn signal<'a>(&self, ctx: &OrderContext<'a>) -> (&'a Bar, &'a Bar) {
        let n = ctx.bars.len();
        (&ctx.bars[n - 1], &ctx.bars[n - 2])
    }

    fn strong_trend(&self, ctx: &OrderContext<'_>, buffer: Price) -> (Branch, Result<Plan, Suppression>) {
        let Some(side) = ctx.regime.direction.side() else {
            return (Branch::StrongTrend, Err(Suppression::NoSetup));
        };
        if let Some(plan) = self.fade(ctx, side, buffer) {
            return (Branch::Fade, Ok(plan));
        }

        let (signal, _) = self.signal(ctx);
        let atr = ctx.vol.atr;
        if signal.height() > self.config.huge_bar_atr * atr {
            return (Branch::StrongTrend, Err(Suppression::ClimaxBar));
        }
        let mut plan = Plan::stop_entry(side, extreme(signal, side), opposite_extreme(signal, side), buffer, 0.0);
        if signal.body() > self.climax_body_atr * atr {
            // Full-range stop on a climactic body is too wide.
            plan.stop = signal.midpoint();
        }
        (Branch::StrongTrend, Ok(plan))
    }

    /// Counter-trend limit when price is statistically overextended from the
    /// trend average and the last bars accelerate into it.
    fn fade(&self, ctx: &OrderContext<'_>, trend: Side, buffer: Price) -> Option<Plan> {
        let bars = ctx.bars;
        let n = bars.len();
        let window = self.config.fade_window;
        if n < window + 3 {
            return None;
        }
        let s = trend.sign();
        let extensions: Vec<f64> = (n - 1 - window..n - 1)
            .map(|i| (bars[i].close - ctx.vol.trend[i]) * s)
            .filter(|e| e.is_finite())
            .collect();
        if extensions.len() < 2 {
            return None;
        }
        let mean = extensions.iter().sum::<f64>() / extensions.len() as f64;
        let var = extensions.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / extensions.len() as f64;

        let (signal, prev) = self.signal(ctx);
        let trend_now = ctx.vol.latest_trend();
        let current = (signal.close - trend_now) * s;
        if !(current > mean + self.config.fade_sigma * var.sqrt()) {
            return None;
        }
        let max_body = bars[n - 1 - window..n - 1]
            .iter()
            .map(Bar::body)
            .fold(0.0, f64::max);
        if !(signal.body() > self.config.fade_body_factor * max_body) {
            return None;
        }
        let accelerating = (signal.close - prev.close) * s > 0.0 && (prev.close - bars[n - 3].close) * s > 0.0;
        if !accelerating {
            return None;
        }

        let side = match trend {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        };
        let entry = extreme(signal, trend) + s * buffer;
        let stop = entry + s * self.config.fade_stop_atr * ctx.vol.atr;
        debug!(current, mean, sd = var.sqrt(), "fade conditions met");
        Some(Plan {
            side,
            kind: EntryKind::Limit,
            entry,
            stop,
            target: trend_now,
            fixed_size: Some(self.config.fade_size),
        })
    }

    fn reversal(&self, ctx: &OrderContext<'_>, buffer: Price) -> Result<Plan, Suppression> {
        let side = ctx.structure.setup.direction().side().ok_or(Suppression::NoSetup)?;
        let (signal, _) = self.signal(ctx);
        let anchor = ctx
            .structure
            .stop_anchor
            .unwrap_or_else(|| opposite_extreme(signal, side));
        Ok(Plan::stop_entry(side, extreme(signal, side), anchor, buffer, self.config.reversal_rr))
    }

    fn channel(&self, ctx: &OrderContext<'_>, buffer: Price) -> Result<Plan, Suppression> {
        let setup = ctx.structure.setup;
        if !setup.is_actionable() {
            return Err(Suppression::NoSetup);
        }
        if setup.direction() != ctx.regime.direction {
            return Err(Suppression::DirectionConflict);
        }
        let side = setup.direction().side().ok_or(Suppression::NoSetup)?;
        let (signal, _) = self.signal(ctx);
        let anchor = ctx
            .structure
            .stop_anchor
            .unwrap_or_else(|| opposite_extreme(signal, side));
        let mut plan = Plan::stop_entry(side, extreme(signal, side), anchor, buffer, self.config.channel_rr);

        // Prior swing extreme in the trade direction acts as a magnet.
        let n = ctx.bars.len();
        let lookback = &ctx.bars[n.saturating_sub(self.config.magnet_window + 1)..n - 1];
        let magnet = match side {
            Side::Buy => lookback.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max),
            Side::Sell => lookback.iter().map(|b| b.low).fold(f64::INFINITY, f64::min),
        };
        let s = side.sign();
        let reward = (magnet - plan.entry) * s;
        let risk = plan.risk();
        let usable = reward.is_finite() && reward > 0.0 && risk > 0.0 && reward / risk >= self.config.min_reward_risk;
        if usable && (magnet - plan.target) * s < 0.0 {
            plan.target = magnet;
        }
        Ok(plan)
    }

    fn trading_range(&self, ctx: &OrderContext<'_>, buffer: Price) -> Result<Plan, Suppression> {
        let (high, low) = self.range_bounds(ctx.bars);
        let span = high - low;
        if !(span > 0.0) {
            return Err(Suppression::MidRange);
        }
        let (signal, prev) = self.signal(ctx);
        let position = (signal.close - low) / span;
        let side = if position <= self.config.range_lower_quartile {
            Side::Buy
        } else if position >= self.config.range_upper_quartile {
            Side::Sell
        } else {
            return Err(Suppression::MidRange);
        };

        let features = self.features.extract(signal, Some(prev), ctx.vol.atr);
        let strong = features.is_trend_bar && features.control == side.direction();
        if !(engulfing(signal, prev, side) || strong) {
            return Err(Suppression::NoSignalBar);
        }
        debug!(high, low, position, %side, "range edge signal");
        Ok(Plan::stop_entry(
            side,
            extreme(signal, side),
            opposite_extreme(signal, side),
            buffer,
            self.config.range_rr,
        ))
    }

    /// Nearest swing high and low, each falling back to the plain extreme of
    /// the fallback window when no pivot qualifies.
    fn range_bounds(&self, bars: &[Bar]) -> (Price, Price) {
        let c = &self.config;
        let fallback = tail(bars, c.range_fallback_window);
        let high = last_swing_pivot(bars, c.range_pivot_window, c.range_pivot_strength, PivotKind::High)
            .map(|p| p.price)
            .unwrap_or_else(|| fallback.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max));
        let low = last_swing_pivot(bars, c.range_pivot_window, c.range_pivot_strength, PivotKind::Low)
            .map(|p| p.price)
            .unwrap_or_else(|| fallback.iter().map(|b| b.low).fold(f64::INFINITY, f64::min));
        (high, low)
    }

    fn breakout(&self, ctx: &OrderContext<'_>, buffer: Price) -> Result<Plan, Suppression> {
        let atr = ctx.vol.atr;
        let ceiling = self.config.breakout_atr_ceiling;
        if ceiling > 0.0 && atr > ceiling {
            return Err(Suppression::VolatilityCeiling);
        }
        let side = ctx.regime.direction.side().ok_or(Suppression::NoSetup)?;
        let window = tail(ctx.bars, self.config.breakout_window);
        let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let height = high - low;

        let (top, bottom) = match side {
            Side::Buy => (high, low),
            Side::Sell => (low, high),
        };
        let mut plan = Plan::stop_entry(side, top, bottom, buffer, 0.0);
        let projection = (self.config.breakout_mm * height).max(self.config.breakout_floor_atr * atr);
        plan.target = plan.entry + side.sign() * projection;
        Ok(plan)
    }
}

/// Signal bar whose body swallows the previous counter-coloured body.
fn engulfing(signal: &Bar, prev: &Bar, side: Side) -> bool {
    let prev_top = prev.open.max(prev.close);
    let prev_bottom = prev.open.min(prev.close);
    match side.direction() {
        Direction::Bull => {
            signal.is_bull() && prev.is_bear() && signal.close >= prev_top && signal.open <= prev_bottom
        }
        _ => signal.is_bear() && prev.is_bull() && signal.close <= prev_bottom && signal.open >= prev_top,
    }
}
