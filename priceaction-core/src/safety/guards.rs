//! Hard-limit guards.
//!
//! Each guard is a single predicate over the snapshot (and the ATR once it is
//! known). A guard returns `Some(Denial)` to veto the cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{SpreadLimit, TimeWindow};
use crate::domain::{Instrument, MarketSnapshot};

/// Why trading was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    /// Parameters make a check undefined (e.g. zero reference balance).
    InvalidConfiguration,
    Drawdown,
    Margin,
    Rollover,
    NoTradeWindow,
    Spread,
    News,
    LossCooldown,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenialReason::InvalidConfiguration => "INVALID_CONFIGURATION",
            DenialReason::Drawdown => "DRAWDOWN",
            DenialReason::Margin => "MARGIN",
            DenialReason::Rollover => "ROLLOVER",
            DenialReason::NoTradeWindow => "NO_TRADE_WINDOW",
            DenialReason::Spread => "SPREAD",
            DenialReason::News => "NEWS",
            DenialReason::LossCooldown => "LOSS_COOLDOWN",
        };
        f.write_str(s)
    }
}

/// A vetoed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Denial {
    pub reason: DenialReason,
    pub context: String,
}

impl Denial {
    fn new(reason: DenialReason, context: String) -> Self {
        Self { reason, context }
    }
}

/// What a guard may look at.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub snapshot: &'a MarketSnapshot,
    /// Volatility unit, when enough history exists to compute it.
    pub atr: Option<f64>,
}

/// Trait for guards that can veto a decision cycle.
pub trait SafetyGuard: Send + Sync {
    /// Returns `Some(Denial)` if trading must stop for this cycle.
    fn check(&self, ctx: &GateContext<'_>) -> Option<Denial>;

    /// Guard name for logging.
    fn name(&self) -> &str;
}

/// Server clock converted to the reference timezone, as fractional hours.
pub fn reference_hour(server_hour: u32, server_minute: u32, utc_offset_hours: i32) -> f64 {
    let hour = (server_hour as i64 + utc_offset_hours as i64).rem_euclid(24);
    hour as f64 + server_minute as f64 / 60.0
}

/// Circuit breaker on equity drawdown from a reference balance.
#[derive(Debug)]
pub struct DrawdownGuard {
    pub reference_balance: f64,
    pub max_drawdown: f64,
}

impl SafetyGuard for DrawdownGuard {
    fn check(&self, ctx: &GateContext<'_>) -> Option<Denial> {
        if !(self.reference_balance > 0.0) {
            return Some(Denial::new(
                DenialReason::InvalidConfiguration,
                format!("reference_balance={}", self.reference_balance),
            ));
        }
        let drawdown = (self.reference_balance - ctx.snapshot.account_equity) / self.reference_balance;
        (drawdown >= self.max_drawdown).then(|| {
            Denial::new(
                DenialReason::Drawdown,
                format!("drawdown={:.1}%, max={:.1}%", drawdown * 100.0, self.max_drawdown * 100.0),
            )
        })
    }

    fn name(&self) -> &str {
        "DrawdownGuard"
    }
}

/// Margin floor. A level of 0 means no margin in use.
#[derive(Debug)]
pub struct MarginGuard {
    pub min_margin_level: f64,
}

impl SafetyGuard for MarginGuard {
    fn check(&self, ctx: &GateContext<'_>) -> Option<Denial> {
        let level = ctx.snapshot.margin_level;
        (level > 0.0 && level < self.min_margin_level).then(|| {
            Denial::new(
                DenialReason::Margin,
                format!("margin_level={level:.1}%, min={:.1}%", self.min_margin_level),
            )
        })
    }

    fn name(&self) -> &str {
        "MarginGuard"
    }
}

/// Rollover and configured no-trade windows in the reference timezone.
#[derive(Debug)]
pub struct SessionGuard {
    pub utc_offset_hours: i32,
    pub rollover: TimeWindow,
    pub no_trade_windows: Vec<TimeWindow>,
}

impl SafetyGuard for SessionGuard {
    fn check(&self, ctx: &GateContext<'_>) -> Option<Denial> {
        let s = ctx.snapshot;
        let hour = reference_hour(s.server_hour, s.server_minute, self.utc_offset_hours);
        if self.rollover.contains(hour) {
            return Some(Denial::new(DenialReason::Rollover, format!("reference_hour={hour:.2}")));
        }
        self.no_trade_windows
            .iter()
            .find(|w| w.contains(hour))
            .map(|w| {
                Denial::new(
                    DenialReason::NoTradeWindow,
                    format!("reference_hour={hour:.2}, window=[{}, {})", w.start_hour, w.end_hour),
                )
            })
    }

    fn name(&self) -> &str {
        "SessionGuard"
    }
}

/// Spread ceiling, fixed or proportional to ATR.
#[derive(Debug)]
pub struct SpreadGuard {
    pub limit: SpreadLimit,
    pub instrument: Instrument,
}

impl SafetyGuard for SpreadGuard {
    fn check(&self, ctx: &GateContext<'_>) -> Option<Denial> {
        let cap = self.limit.cap_points(ctx.atr, &self.instrument);
        let spread = ctx.snapshot.spread as f64;
        (spread > cap).then(|| Denial::new(DenialReason::Spread, format!("spread={spread:.0}, cap={cap:.0}")))
    }

    fn name(&self) -> &str {
        "SpreadGuard"
    }
}

/// Blackout around high-impact news.
#[derive(Debug)]
pub struct NewsGuard {
    pub min_impact: u8,
    pub padding_minutes: i64,
}

impl SafetyGuard for NewsGuard {
    fn check(&self, ctx: &GateContext<'_>) -> Option<Denial> {
        let news = &ctx.snapshot.news;
        let blackout = news.has_event
            && news.impact_level >= self.min_impact
            && news.minutes_to_event.abs() <= self.padding_minutes;
        blackout.then(|| {
            Denial::new(
                DenialReason::News,
                format!("{} in {} min", news.name, news.minutes_to_event),
            )
        })
    }

    fn name(&self) -> &str {
        "NewsGuard"
    }
}

/// Pause after a losing trade, measured against the newest bar's start.
#[derive(Debug)]
pub struct CooldownGuard {
    pub minutes: i64,
}

impl SafetyGuard for CooldownGuard {
    fn check(&self, ctx: &GateContext<'_>) -> Option<Denial> {
        let last = ctx.snapshot.last_closed_trade.as_ref()?;
        if last.profit >= 0.0 {
            return None;
        }
        let now = ctx.snapshot.latest_bar_time()?;
        let elapsed = (now - last.close_time).num_minutes();
        (elapsed < self.minutes).then(|| {
            Denial::new(
                DenialReason::LossCooldown,
                format!("loss {:.2} closed {elapsed} min ago", last.profit),
            )
        })
    }

    fn name(&self) -> &str {
        "CooldownGuard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, ClosedTrade, NewsEvent};
    use chrono::{Duration, TimeZone, Utc};

    fn snapshot() -> MarketSnapshot {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        MarketSnapshot {
            symbol: "XAUUSD".into(),
            server_hour: 10,
            server_minute: 0,
            bid: 2000.0,
            ask: 2000.2,
            spread: 20,
            account_equity: 10_000.0,
            margin_level: 0.0,
            bars: vec![Bar::new(t0, 2000.0, 2001.0, 1999.0, 2000.5)],
            htf_bars: Vec::new(),
            news: NewsEvent::default(),
            positions: Vec::new(),
            last_closed_trade: None,
        }
    }

    fn ctx(snapshot: &MarketSnapshot) -> GateContext<'_> {
        GateContext {
            snapshot,
            atr: Some(5.0),
        }
    }

    #[test]
    fn reference_hour_wraps() {
        assert_eq!(reference_hour(20, 30, 6), 2.5);
        assert_eq!(reference_hour(1, 0, -3), 22.0);
    }

    #[test]
    fn drawdown_at_limit_denies() {
        let guard = DrawdownGuard {
            reference_balance: 10_000.0,
            max_drawdown: 0.15,
        };
        let mut s = snapshot();
        s.account_equity = 8_600.0;
        assert!(guard.check(&ctx(&s)).is_none());
        s.account_equity = 8_500.0;
        assert_eq!(guard.check(&ctx(&s)).unwrap().reason, DenialReason::Drawdown);
    }

    #[test]
    fn zero_reference_balance_is_unsafe() {
        let guard = DrawdownGuard {
            reference_balance: 0.0,
            max_drawdown: 0.15,
        };
        let s = snapshot();
        assert_eq!(guard.check(&ctx(&s)).unwrap().reason, DenialReason::InvalidConfiguration);
    }

    #[test]
    fn margin_zero_means_unused() {
        let guard = MarginGuard {
            min_margin_level: 1000.0,
        };
        let mut s = snapshot();
        assert!(guard.check(&ctx(&s)).is_none());
        s.margin_level = 800.0;
        assert_eq!(guard.check(&ctx(&s)).unwrap().reason, DenialReason::Margin);
        s.margin_level = 2500.0;
        assert!(guard.check(&ctx(&s)).is_none());
    }

    #[test]
    fn rollover_and_no_trade_windows() {
        let guard = SessionGuard {
            utc_offset_hours: 6,
            rollover: TimeWindow::new(6.0, 7.0),
            no_trade_windows: vec![TimeWindow::new(23.5, 1.0)],
        };
        let mut s = snapshot();
        s.server_hour = 0;
        s.server_minute = 30;
        assert_eq!(guard.check(&ctx(&s)).unwrap().reason, DenialReason::Rollover);
        s.server_hour = 18;
        s.server_minute = 0;
        assert_eq!(guard.check(&ctx(&s)).unwrap().reason, DenialReason::NoTradeWindow);
        s.server_hour = 10;
        assert!(guard.check(&ctx(&s)).is_none());
    }

    #[test]
    fn spread_cap_scales_with_atr() {
        let guard = SpreadGuard {
            limit: SpreadLimit::Atr {
                atr_ratio: 0.15,
                floor_points: 200.0,
            },
            instrument: Instrument::default(),
        };
        // ATR 20.0 -> 2000 points * 0.15 = 300 point cap.
        let mut s = snapshot();
        s.spread = 300;
        let c = GateContext {
            snapshot: &s,
            atr: Some(20.0),
        };
        assert!(guard.check(&c).is_none());
        s.spread = 301;
        let c = GateContext {
            snapshot: &s,
            atr: Some(20.0),
        };
        assert_eq!(guard.check(&c).unwrap().reason, DenialReason::Spread);
    }

    #[test]
    fn news_blackout_needs_high_impact_and_proximity() {
        let guard = NewsGuard {
            min_impact: 3,
            padding_minutes: 30,
        };
        let mut s = snapshot();
        s.news = NewsEvent {
            has_event: true,
            impact_level: 3,
            minutes_to_event: -20,
            name: "NFP".into(),
        };
        assert_eq!(guard.check(&ctx(&s)).unwrap().reason, DenialReason::News);
        s.news.impact_level = 2;
        assert!(guard.check(&ctx(&s)).is_none());
        s.news.impact_level = 3;
        s.news.minutes_to_event = 45;
        assert!(guard.check(&ctx(&s)).is_none());
    }

    #[test]
    fn cooldown_only_after_losses() {
        let guard = CooldownGuard { minutes: 30 };
        let mut s = snapshot();
        let now = s.latest_bar_time().unwrap();
        s.last_closed_trade = Some(ClosedTrade {
            profit: -12.0,
            close_time: now - Duration::minutes(10),
        });
        assert_eq!(guard.check(&ctx(&s)).unwrap().reason, DenialReason::LossCooldown);
        s.last_closed_trade = Some(ClosedTrade {
            profit: 12.0,
            close_time: now - Duration::minutes(10),
        });
        assert!(guard.check(&ctx(&s)).is_none());
        s.last_closed_trade = Some(ClosedTrade {
            profit: -12.0,
            close_time: now - Duration::minutes(31),
        });
        assert!(guard.check(&ctx(&s)).is_none());
    }
}
