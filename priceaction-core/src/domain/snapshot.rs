//! Market snapshot: everything one decision cycle is allowed to see.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Bar, Position, Price};

/// Scheduled news event descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsEvent {
    #[serde(alias = "has_news", default)]
    pub has_event: bool,
    /// 0 = none, 1 = low, 2 = medium, 3 = high.
    #[serde(default)]
    pub impact_level: u8,
    /// Positive = upcoming, negative = already released.
    #[serde(alias = "minutes_to_news", default)]
    pub minutes_to_event: i64,
    #[serde(alias = "event_name", default)]
    pub name: String,
}

/// Outcome of the most recently closed trade, used for the loss cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub profit: f64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub close_time: DateTime<Utc>,
}

/// Request payload: account state, market state and bar history.
///
/// `bars` is the execution timeframe (oldest → newest), `htf_bars` the
/// higher timeframe used only for the always-in bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    #[serde(alias = "server_time_hour")]
    pub server_hour: u32,
    #[serde(alias = "server_time_minute", default)]
    pub server_minute: u32,
    pub bid: Price,
    pub ask: Price,
    /// Current spread in broker points.
    pub spread: u32,
    pub account_equity: f64,
    /// Margin level in percent; 0 when no margin is in use.
    #[serde(default)]
    pub margin_level: f64,
    #[serde(alias = "m5_candles")]
    pub bars: Vec<Bar>,
    #[serde(alias = "h1_candles", default)]
    pub htf_bars: Vec<Bar>,
    #[serde(alias = "news_info", default)]
    pub news: NewsEvent,
    #[serde(alias = "current_positions", default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub last_closed_trade: Option<ClosedTrade>,
}

impl MarketSnapshot {
    /// Start time of the newest bar, the engine's notion of "now".
    pub fn latest_bar_time(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.start_time)
    }

    /// Summed size of all open positions.
    pub fn open_size(&self) -> f64 {
        self.positions.iter().map(|p| p.size).sum()
    }
}
