//! End-to-end decision cycles through `DecisionEngine::decide`.
//!
//! Tests:
//! 1. Channel pullback: second-entry buy stop above the signal bar
//! 2. Barbwire: overlapping doji-like bars always hold
//! 3. Safety gate: spread, rollover and drawdown (force close)
//! 4. Position management: trailing stop and the pyramiding guard
//! 5. Repeatability and trace/reason consistency

use chrono::{DateTime, Duration, TimeZone, Utc};
use priceaction_core::domain::{Bar, MarketSnapshot, NewsEvent, Position, Side};
use priceaction_core::engine::{Branch, Suppression};
use priceaction_core::regime::Regime;
use priceaction_core::safety::DenialReason;
use priceaction_core::structure::Setup;
use priceaction_core::{DecisionEngine, EngineConfig, OrderAction};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
}

fn push(bars: &mut Vec<Bar>, open: f64, high: f64, low: f64, close: f64) {
    let time = t0() + Duration::minutes(5 * bars.len() as i64);
    bars.push(Bar::new(time, open, high, low, close));
}

/// 100 bars: a slow overlapping climb, a six-bar leg up, three bear bars
/// back to the trend average and a strong bull signal bar.
fn channel_pullback_bars() -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut close = 2000.0;
    for _ in 0..90 {
        let open = close;
        close = open + 0.5;
        push(&mut bars, open, close + 2.5 - 0.25, open - 2.5 + 0.25, close);
    }
    for _ in 0..6 {
        let open = close;
        close = open + 3.5;
        push(&mut bars, open, close + 2.5 - 1.75, open - 2.5 + 1.75, close);
    }
    for _ in 0..3 {
        let open = close;
        close = open - 6.0;
        push(&mut bars, open, open + 0.5, close - 0.5, close);
    }
    let open = close;
    let signal_close = open + 7.0;
    push(&mut bars, open, signal_close + 0.25, open - 0.25, signal_close);
    bars
}

/// Sixty bars stacked on top of each other with alternating tiny bodies.
fn barbwire_bars() -> Vec<Bar> {
    let mut bars = Vec::new();
    for i in 0..60 {
        let (open, close) = if i % 2 == 1 { (2000.5, 1999.5) } else { (1999.5, 2000.5) };
        push(&mut bars, open, 2002.0, 1998.0, close);
    }
    bars
}

fn snapshot(bars: Vec<Bar>) -> MarketSnapshot {
    let last = bars.last().map(|b| b.close).unwrap_or(0.0);
    MarketSnapshot {
        symbol: "XAUUSD".into(),
        server_hour: 10,
        server_minute: 0,
        bid: last,
        ask: last + 0.2,
        spread: 20,
        account_equity: 10_000.0,
        margin_level: 0.0,
        bars,
        htf_bars: Vec::new(),
        news: NewsEvent::default(),
        positions: Vec::new(),
        last_closed_trade: None,
    }
}

fn long_position(id: u64, open: f64, current: f64, stop: f64, pnl: f64) -> Position {
    Position {
        id,
        side: Side::Buy,
        size: 0.01,
        open_price: open,
        current_price: current,
        stop,
        target: 0.0,
        unrealized_pnl: pnl,
        tag: String::new(),
    }
}

fn engine() -> DecisionEngine {
    DecisionEngine::new(&EngineConfig::default())
}

fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "actual={actual}, expected={expected}, epsilon={epsilon}"
    );
}

// ── 1. Channel pullback ──────────────────────────────────────────────

#[test]
fn channel_second_entry_places_buy_stop() {
    let bars = channel_pullback_bars();
    let signal = bars.last().unwrap().clone();
    let decision = engine().decide(&snapshot(bars));
    let order = &decision.instruction;

    assert_eq!(decision.trace.regime, Regime::Channel);
    assert_eq!(decision.trace.setup, Setup::H2);
    assert_eq!(decision.trace.branch, Branch::Channel);
    assert_eq!(decision.trace.suppression, None);
    assert_eq!(order.action, OrderAction::PlaceBuyStop);
    assert_eq!(order.reason, "CHANNEL|H2|CHANNEL");

    let atr = decision.trace.atr.unwrap();
    assert_approx(atr, 5.607_142_857, 1e-6);

    // Entry one buffer above the signal high, stop one buffer under the
    // pullback low (2047.5), target at the prior leg high.
    assert_approx(order.entry_price, signal.high + 0.05 * atr, 0.006);
    assert_approx(order.entry_price, 2055.53, 1e-6);
    assert_approx(order.stop_price, 2047.21, 1e-6);
    assert!(order.stop_price < 2047.5);
    assert_approx(order.target_price, 2066.75, 1e-6);

    // 50 / (100 * 8.32) exceeds the cap.
    assert_approx(order.size, 0.04, 1e-9);
    assert!(order.stop_price < order.entry_price && order.entry_price < order.target_price);
}

#[test]
fn channel_entry_survives_price_translation() {
    let shifted: Vec<Bar> = channel_pullback_bars()
        .into_iter()
        .map(|b| Bar::new(b.start_time, b.open + 500.0, b.high + 500.0, b.low + 500.0, b.close + 500.0))
        .collect();
    let decision = engine().decide(&snapshot(shifted));
    assert_eq!(decision.trace.regime, Regime::Channel);
    assert_eq!(decision.trace.setup, Setup::H2);
    assert_eq!(decision.instruction.action, OrderAction::PlaceBuyStop);
}

// ── 2. Barbwire ──────────────────────────────────────────────────────

#[test]
fn barbwire_holds() {
    let decision = engine().decide(&snapshot(barbwire_bars()));
    assert!(decision.instruction.is_hold());
    assert_eq!(decision.trace.regime, Regime::Barbwire);
    assert_eq!(decision.trace.suppression, Some(Suppression::Chop));
    assert_eq!(decision.instruction.reason, "BARBWIRE|NONE|BARBWIRE:CHOP");
}

// ── 3. Safety gate ───────────────────────────────────────────────────

#[test]
fn wide_spread_blocks_a_valid_setup() {
    let mut snap = snapshot(channel_pullback_bars());
    // The ATR-scaled cap is floored at 200 points.
    snap.spread = 600;
    let decision = engine().decide(&snap);
    assert!(decision.instruction.is_hold());
    assert_eq!(
        decision.trace.suppression,
        Some(Suppression::Safety(DenialReason::Spread))
    );
    assert!(decision.instruction.reason.ends_with("GATE:SPREAD"));
}

#[test]
fn rollover_hour_blocks_entries() {
    let mut snap = snapshot(channel_pullback_bars());
    // Server 00:30 is 06:30 in the reference timezone.
    snap.server_hour = 0;
    snap.server_minute = 30;
    let decision = engine().decide(&snap);
    assert!(decision.instruction.is_hold());
    assert_eq!(
        decision.trace.suppression,
        Some(Suppression::Safety(DenialReason::Rollover))
    );
}

#[test]
fn drawdown_breach_closes_the_book() {
    let mut snap = snapshot(channel_pullback_bars());
    snap.account_equity = 8_000.0;
    snap.positions = vec![long_position(4242, 2050.0, 2055.0, 2040.0, 5.0)];
    let decision = engine().decide(&snap);
    assert_eq!(decision.instruction.action, OrderAction::ClosePos);
    assert_eq!(decision.instruction.ticket, 4242);
    assert_approx(decision.instruction.size, 0.01, 1e-12);
    assert_eq!(decision.trace.branch, Branch::ForceClose);
    assert_eq!(decision.instruction.reason, "UNKNOWN|NONE|FORCE_CLOSE:DRAWDOWN");
}

#[test]
fn drawdown_without_positions_holds() {
    let mut snap = snapshot(channel_pullback_bars());
    snap.account_equity = 8_000.0;
    let decision = engine().decide(&snap);
    assert!(decision.instruction.is_hold());
    assert_eq!(decision.instruction.reason, "UNKNOWN|NONE|GATE:DRAWDOWN");
}

// ── 4. Position management ───────────────────────────────────────────

#[test]
fn profitable_long_trails_its_stop() {
    let mut snap = snapshot(channel_pullback_bars());
    snap.positions = vec![long_position(7, 2040.0, 2055.0, 2030.0, 150.0)];
    let decision = engine().decide(&snap);
    let order = &decision.instruction;
    let atr = decision.trace.atr.unwrap();

    assert_eq!(order.action, OrderAction::ModifySl);
    assert_eq!(order.ticket, 7);
    assert_eq!(decision.trace.branch, Branch::TrailStop);
    // Channel trails 1.5 ATR behind price, rounded away from it.
    assert!(order.stop_price <= 2055.0 - 1.5 * atr + 1e-9);
    assert!(order.stop_price > 2055.0 - 1.5 * atr - 0.011);
    assert!(order.stop_price > 2030.0);
    assert_eq!(decision.instruction.reason, "CHANNEL|NONE|TRAIL_STOP");
}

#[test]
fn losing_position_blocks_new_entries() {
    let mut snap = snapshot(channel_pullback_bars());
    snap.positions = vec![long_position(8, 2060.0, 2055.0, 2040.0, -50.0)];
    let decision = engine().decide(&snap);
    assert!(decision.instruction.is_hold());
    assert_eq!(decision.trace.branch, Branch::EntryGuard);
    assert_eq!(decision.trace.suppression, Some(Suppression::Pyramiding));
    assert_eq!(decision.instruction.reason, "CHANNEL|NONE|ENTRY_GUARD:PYRAMIDING");
}

// ── 5. Repeatability ─────────────────────────────────────────────────

#[test]
fn identical_snapshots_give_identical_decisions() {
    let snap = snapshot(channel_pullback_bars());
    let e = engine();
    let first = e.decide(&snap);
    for _ in 0..5 {
        assert_eq!(e.decide(&snap), first);
    }
    assert_eq!(
        DecisionEngine::new(&EngineConfig::default()).decide(&snap),
        first
    );
}

#[test]
fn reason_is_rendered_from_trace() {
    for bars in [channel_pullback_bars(), barbwire_bars(), channel_pullback_bars()[..10].to_vec()] {
        let decision = engine().decide(&snapshot(bars));
        assert_eq!(decision.instruction.reason, decision.trace.reason());
    }
}

#[test]
fn decision_round_trips_through_json() {
    let decision = engine().decide(&snapshot(channel_pullback_bars()));
    let json = serde_json::to_string(&decision.instruction).unwrap();
    assert!(json.contains("\"action\":\"PLACE_BUY_STOP\""));
    assert!(json.contains("\"sl\""));
    assert!(json.contains("\"lot\""));
}
