//! Engine configuration: one immutable value threaded through every component.
//!
//! All thresholds are expressed as multiples of the volatility unit (ATR)
//! unless the field name says otherwise. Every section is `#[serde(default)]`
//! so a TOML file only needs to list the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::Instrument;
use crate::error::ConfigError;
use crate::fingerprint::ConfigHash;

/// Complete configuration for one decision engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: Instrument,
    pub volatility: VolatilityConfig,
    pub bars: BarConfig,
    pub regime: RegimeConfig,
    pub structure: StructureConfig,
    pub orders: OrderConfig,
    pub sizing: SizingConfig,
    pub safety: SafetyConfig,
    pub management: ManagementConfig,
}

impl EngineConfig {
    /// Parse a TOML document. Omitted keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Content hash of the full parameter set.
    pub fn fingerprint(&self) -> ConfigHash {
        ConfigHash::of(self)
    }

    /// Reject structurally impossible parameter sets.
    ///
    /// A zero reference balance is deliberately not rejected here: the safety
    /// gate treats it as an unsafe condition and denies trading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.instrument.validate()?;

        let v = &self.volatility;
        if v.atr_period == 0 {
            return Err(ConfigError::invalid("volatility.atr_period", "must be >= 1"));
        }
        if v.trend_period == 0 {
            return Err(ConfigError::invalid("volatility.trend_period", "must be >= 1"));
        }
        let floor = self.required_history();
        if v.min_bars < floor {
            return Err(ConfigError::invalid(
                "volatility.min_bars",
                format!("must be >= {floor} for the configured lookbacks"),
            ));
        }
        if !(v.default_atr > 0.0) {
            return Err(ConfigError::invalid("volatility.default_atr", "must be > 0"));
        }

        let r = &self.regime;
        if r.barbwire_range_atr > r.breakout_range_atr {
            return Err(ConfigError::invalid(
                "regime.barbwire_range_atr",
                "tight compression must not exceed breakout compression",
            ));
        }
        if r.range_band_min_atr > r.range_band_max_atr {
            return Err(ConfigError::invalid("regime.range_band_min_atr", "band is inverted"));
        }

        let s = &self.structure;
        if s.mtr_window_end >= s.mtr_window_start {
            return Err(ConfigError::invalid(
                "structure.mtr_window_end",
                "must be smaller than mtr_window_start",
            ));
        }
        if s.pivot_left == 0 {
            return Err(ConfigError::invalid("structure.pivot_left", "must be >= 1"));
        }

        let o = &self.orders;
        if o.range_lower_quartile >= o.range_upper_quartile {
            return Err(ConfigError::invalid("orders.range_lower_quartile", "quartiles are inverted"));
        }

        let z = &self.sizing;
        if !(z.min_size > 0.0) || z.min_size > z.max_size {
            return Err(ConfigError::invalid(
                "sizing.min_size",
                format!("need 0 < min_size <= max_size, got {} / {}", z.min_size, z.max_size),
            ));
        }
        if !(z.risk_per_trade > 0.0) {
            return Err(ConfigError::invalid("sizing.risk_per_trade", "must be > 0"));
        }
        Ok(())
    }

    /// Minimum bar count the configured lookbacks need to be meaningful.
    pub fn required_history(&self) -> usize {
        let v = &self.volatility;
        let r = &self.regime;
        (v.atr_period + 1)
            .max(v.trend_period + r.slope_lookback)
            .max(r.compression_window + 1)
    }
}

/// Shape of the trend-average line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendKind {
    Ema,
    Sma,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub atr_period: usize,
    pub trend_period: usize,
    pub trend_kind: TrendKind,
    /// History floor; shorter windows produce no decision.
    pub min_bars: usize,
    /// Substituted when the rolling ATR is undefined or non-positive.
    pub default_atr: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            trend_period: 20,
            trend_kind: TrendKind::Ema,
            min_bars: 30,
            default_atr: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Close within this fraction of the high (low) marks bull (bear) control.
    pub close_zone: f64,
    /// Body above this many ATR makes a trend bar.
    pub trend_bar_atr: f64,
    /// Wick share of the range that counts as rejection.
    pub tail_ratio: f64,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            close_zone: 0.2,
            trend_bar_atr: 0.6,
            tail_ratio: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub slope_lookback: usize,
    pub crossing_window: usize,
    pub compression_window: usize,
    pub strong_slope_atr: f64,
    /// Multiplier on `strong_slope_atr` while range-bound or choppy.
    pub range_bound_slope_factor: f64,
    pub flat_slope_atr: f64,
    pub chop_overlap: f64,
    pub chop_min_bars: usize,
    pub momentum_body_atr: f64,
    pub climax_body_atr: f64,
    pub barbwire_range_atr: f64,
    pub breakout_range_atr: f64,
    pub breakout_body_window: usize,
    pub breakout_body_multiple: f64,
    pub range_band_min_atr: f64,
    pub range_band_max_atr: f64,
    pub range_crossings: usize,
    pub htf_min_bars: usize,
    pub htf_slope_atr: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            slope_lookback: 3,
            crossing_window: 20,
            compression_window: 10,
            strong_slope_atr: 1.0,
            range_bound_slope_factor: 1.5,
            flat_slope_atr: 0.3,
            chop_overlap: 0.3,
            chop_min_bars: 6,
            momentum_body_atr: 0.8,
            climax_body_atr: 2.0,
            barbwire_range_atr: 2.0,
            breakout_range_atr: 2.5,
            breakout_body_window: 20,
            breakout_body_multiple: 8.0,
            range_band_min_atr: 2.5,
            range_band_max_atr: 4.0,
            range_crossings: 5,
            htf_min_bars: 24,
            htf_slope_atr: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub pullback_window: usize,
    pub depth_margin_atr: f64,
    pub magnet_atr: f64,
    pub weak_slope_atr: f64,
    pub micro_tolerance_atr: f64,
    /// Bars whose extent decides whether a micro pattern sits in wide chop.
    pub micro_window: usize,
    pub micro_max_range_atr: f64,
    pub reset_window: usize,
    pub reset_body_atr: f64,
    pub pivot_left: usize,
    pub wedge_window: usize,
    pub near_parallel_ratio: f64,
    pub wedge_wick_ratio: f64,
    pub wedge_recency: usize,
    pub wedge_threshold: i32,
    /// MTR scan covers bars `n - mtr_window_start ..= n - mtr_window_end`.
    pub mtr_window_start: usize,
    pub mtr_window_end: usize,
    pub mtr_body_atr: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            pullback_window: 10,
            depth_margin_atr: 0.2,
            magnet_atr: 2.0,
            weak_slope_atr: 0.05,
            micro_tolerance_atr: 0.1,
            micro_window: 10,
            micro_max_range_atr: 4.0,
            reset_window: 5,
            reset_body_atr: 1.5,
            pivot_left: 5,
            wedge_window: 60,
            near_parallel_ratio: 1.2,
            wedge_wick_ratio: 0.3,
            wedge_recency: 5,
            wedge_threshold: 80,
            mtr_window_start: 30,
            mtr_window_end: 5,
            mtr_body_atr: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Entry buffer floor in price units (one "tick" of slack).
    pub min_buffer: f64,
    pub buffer_atr: f64,
    pub huge_bar_atr: f64,
    pub fade_window: usize,
    pub fade_sigma: f64,
    pub fade_body_factor: f64,
    pub fade_stop_atr: f64,
    pub fade_size: f64,
    pub reversal_rr: f64,
    pub channel_rr: f64,
    pub magnet_window: usize,
    pub range_rr: f64,
    pub range_pivot_window: usize,
    pub range_pivot_strength: usize,
    pub range_fallback_window: usize,
    pub range_lower_quartile: f64,
    pub range_upper_quartile: f64,
    pub breakout_window: usize,
    pub breakout_mm: f64,
    pub breakout_floor_atr: f64,
    /// Absolute ATR above which breakouts are treated as traps; <= 0 disables.
    pub breakout_atr_ceiling: f64,
    pub min_reward_risk: f64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            min_buffer: 0.10,
            buffer_atr: 0.05,
            huge_bar_atr: 3.0,
            fade_window: 50,
            fade_sigma: 3.0,
            fade_body_factor: 1.1,
            fade_stop_atr: 1.5,
            fade_size: 0.01,
            reversal_rr: 3.0,
            channel_rr: 2.0,
            magnet_window: 20,
            range_rr: 1.5,
            range_pivot_window: 100,
            range_pivot_strength: 5,
            range_fallback_window: 50,
            range_lower_quartile: 0.25,
            range_upper_quartile: 0.75,
            breakout_window: 10,
            breakout_mm: 2.0,
            breakout_floor_atr: 1.0,
            breakout_atr_ceiling: 10.0,
            min_reward_risk: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Account-currency amount risked per trade.
    pub risk_per_trade: f64,
    pub min_size: f64,
    pub max_size: f64,
    /// No new entries while open size is at or above this.
    pub max_total_size: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 50.0,
            min_size: 0.01,
            max_size: 0.04,
            max_total_size: 0.04,
        }
    }
}

/// A `[start, end)` window in fractional reference-timezone hours.
/// Windows with `start > end` wrap midnight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_hour: f64,
    pub end_hour: f64,
}

impl TimeWindow {
    pub fn new(start_hour: f64, end_hour: f64) -> Self {
        Self { start_hour, end_hour }
    }

    pub fn contains(&self, hour: f64) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Spread ceiling policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpreadLimit {
    /// Fixed cap in broker points.
    Fixed { max_points: f64 },
    /// Cap proportional to ATR (converted to points), never below the floor.
    Atr { atr_ratio: f64, floor_points: f64 },
}

impl SpreadLimit {
    /// Cap in points given the current ATR (if one is available).
    pub fn cap_points(&self, atr: Option<f64>, instrument: &Instrument) -> f64 {
        match *self {
            SpreadLimit::Fixed { max_points } => max_points,
            SpreadLimit::Atr {
                atr_ratio,
                floor_points,
            } => match atr {
                Some(atr) => (instrument.to_points(atr) * atr_ratio).max(floor_points),
                None => floor_points,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub reference_balance: f64,
    /// Fractional drawdown from the reference balance that halts trading.
    pub max_drawdown: f64,
    pub force_close_on_drawdown: bool,
    /// Percent; a reported margin level of 0 means no margin in use.
    pub min_margin_level: f64,
    /// Hours added to server time to reach the reference timezone.
    pub utc_offset_hours: i32,
    pub rollover: TimeWindow,
    pub no_trade_windows: Vec<TimeWindow>,
    pub spread: SpreadLimit,
    pub news_min_impact: u8,
    pub news_padding_minutes: i64,
    pub loss_cooldown_minutes: i64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            reference_balance: 10_000.0,
            max_drawdown: 0.15,
            force_close_on_drawdown: true,
            min_margin_level: 1000.0,
            utc_offset_hours: 6,
            rollover: TimeWindow::new(6.0, 7.0),
            no_trade_windows: Vec::new(),
            spread: SpreadLimit::Atr {
                atr_ratio: 0.15,
                floor_points: 200.0,
            },
            news_min_impact: 3,
            news_padding_minutes: 30,
            loss_cooldown_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    pub partial_close_atr: f64,
    pub partial_close_size: f64,
    /// Tag substring marking a position as already partially closed.
    pub partial_marker: String,
    pub trail_strong_atr: f64,
    pub trail_channel_atr: f64,
    pub trail_breakout_atr: f64,
    pub trail_range_atr: f64,
    pub trail_min_step_atr: f64,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            partial_close_atr: 1.0,
            partial_close_size: 0.01,
            partial_marker: "PARTIAL".into(),
            trail_strong_atr: 2.0,
            trail_channel_atr: 1.5,
            trail_breakout_atr: 1.5,
            trail_range_atr: 1.0,
            trail_min_step_atr: 0.1,
        }
    }
}
