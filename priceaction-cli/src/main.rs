//! Price-action CLI: evaluate snapshots, print configuration, diagnostics.
//!
//! Commands:
//! - `decide`: run one decision cycle on a JSON market snapshot
//! - `default-config`: print the default configuration as TOML
//! - `diagnose`: echo platform, clock, session windows and risk settings

use anyhow::{bail, Context, Result};
use chrono::{Local, Timelike, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use priceaction_core::config::{SpreadLimit, TimeWindow};
use priceaction_core::domain::MarketSnapshot;
use priceaction_core::safety::reference_hour;
use priceaction_core::{DecisionEngine, EngineConfig};

#[derive(Parser)]
#[command(
    name = "priceaction",
    version,
    about = "Price-action decision engine: regime, structure and order construction"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a market snapshot and print the resulting instruction.
    Decide {
        /// JSON snapshot file.
        #[arg(long)]
        snapshot: PathBuf,

        /// TOML configuration file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the structured decision trace alongside the instruction.
        #[arg(long, default_value_t = false)]
        trace: bool,

        /// Pretty-print the JSON output.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
    /// Echo platform, clock and the configured trading limits.
    Diagnose {
        /// TOML configuration file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Commands::Decide {
            snapshot,
            config,
            trace,
            pretty,
        } => run_decide(&snapshot, config.as_deref(), trace, pretty),
        Commands::DefaultConfig => {
            print!("{}", EngineConfig::default().to_toml_string()?);
            Ok(())
        }
        Commands::Diagnose { config } => run_diagnose(config.as_deref()),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run_decide(snapshot_path: &Path, config_path: Option<&Path>, trace: bool, pretty: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = DecisionEngine::new(&config);

    let content = std::fs::read_to_string(snapshot_path)
        .with_context(|| format!("failed to read snapshot {}", snapshot_path.display()))?;
    let snapshot: MarketSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot {}", snapshot_path.display()))?;
    if snapshot.bars.is_empty() {
        bail!("snapshot {} carries no bars", snapshot_path.display());
    }
    info!(
        symbol = %snapshot.symbol,
        bars = snapshot.bars.len(),
        htf_bars = snapshot.htf_bars.len(),
        positions = snapshot.positions.len(),
        "snapshot loaded"
    );

    let decision = engine.decide(&snapshot);
    let value = if trace {
        serde_json::to_value(&decision)?
    } else {
        serde_json::to_value(&decision.instruction)?
    };
    let out = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{out}");
    Ok(())
}

fn run_diagnose(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let safety = &config.safety;
    let local = Local::now();
    let utc = Utc::now();
    let ref_hour = reference_hour(local.hour(), local.minute(), safety.utc_offset_hours);

    println!();
    println!("=== Environment ===");
    println!("OS:             {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    println!("Version:        {}", env!("CARGO_PKG_VERSION"));
    println!("Config hash:    {}", config.fingerprint().short());
    println!("Local time:     {}", local.format("%Y-%m-%d %H:%M:%S %:z"));
    println!("UTC time:       {}", utc.format("%Y-%m-%d %H:%M:%S"));
    println!(
        "Reference hour: {:.2} (local clock {:+}h)",
        ref_hour, safety.utc_offset_hours
    );
    println!();
    println!("--- Session ---");
    println!("Rollover:       {}", format_window(&safety.rollover));
    if safety.no_trade_windows.is_empty() {
        println!("No-trade:       (none)");
    }
    for window in &safety.no_trade_windows {
        println!("No-trade:       {}", format_window(window));
    }
    let blocked = safety.rollover.contains(ref_hour)
        || safety.no_trade_windows.iter().any(|w| w.contains(ref_hour));
    println!("Blocked now:    {}", if blocked { "YES" } else { "no" });
    println!();
    println!("--- Spread ---");
    match &safety.spread {
        SpreadLimit::Fixed { max_points } => println!("Mode:           fixed, {max_points} points"),
        SpreadLimit::Atr {
            atr_ratio,
            floor_points,
        } => println!("Mode:           {:.0}% of ATR, floor {floor_points} points", atr_ratio * 100.0),
    }
    println!();
    println!("--- Risk ---");
    println!("Risk per trade: {:.2}", config.sizing.risk_per_trade);
    println!(
        "Size bounds:    {} .. {} (total {})",
        config.sizing.min_size, config.sizing.max_size, config.sizing.max_total_size
    );
    println!(
        "Drawdown:       {:.1}% of {:.2}{}",
        safety.max_drawdown * 100.0,
        safety.reference_balance,
        if safety.force_close_on_drawdown { ", force close" } else { "" }
    );
    println!("Min margin:     {:.0}%", safety.min_margin_level);
    println!(
        "News blackout:  impact >= {}, +/- {} min",
        safety.news_min_impact, safety.news_padding_minutes
    );
    println!("Loss cooldown:  {} min", safety.loss_cooldown_minutes);
    println!();
    Ok(())
}

fn format_window(window: &TimeWindow) -> String {
    format!("[{:05.2}, {:05.2})", window.start_hour, window.end_hour)
}
