//! Ticker daemon entry point.
//!
//! Runs the process ticker standalone for a bounded time and reports the
//! cadence it observed. Useful for checking which backend a host selects
//! and how faithfully it keeps the interval.

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use ticker_common::config::TickerConfig;
use ticker_runtime::{TickCounter, Ticker};
use tracing::{info, warn};

use crate::report::{expected_ticks, RunSummary};

/// Ticks recorded by the signal handler.
static TICKS: TickCounter = TickCounter::new();

extern "C" fn on_tick(_: libc::c_int) {
    TICKS.record();
}

/// Ticker daemon command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "tickerd",
    about = "Drive the runtime ticker and report observed tick cadence",
    version,
    long_about = None
)]
struct Args {
    /// Path to a ticker configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Tick interval, e.g. "10ms" (overrides config file).
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// How long to keep the ticker running.
    #[arg(long, short = 'd', default_value = "1s", value_parser = humantime::parse_duration)]
    duration: Duration,

    /// How often to log progress while running.
    #[arg(long, default_value = "250ms", value_parser = humantime::parse_duration)]
    report_every: Duration,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting tickerd");

    let mut config = load_config(&args)?;
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    config.validate().context("Invalid ticker configuration")?;

    info!(interval = ?config.interval, "Configuration loaded");

    let summary = run(&config, args.duration, args.report_every)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "backend={} signal={} interval={} elapsed={} ticks={} expected={} ratio={:.3}",
            summary.backend,
            summary.signal,
            humantime::format_duration(config.interval),
            humantime::format_duration(Duration::from_micros(summary.elapsed_us)),
            summary.ticks,
            summary.expected_ticks,
            summary.ratio(),
        );
    }
    Ok(())
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("tickerd={level},ticker_runtime={level},ticker_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `TICKER_CONFIG_PATH` environment variable
/// 3. Built-in defaults
fn load_config(args: &Args) -> Result<TickerConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return TickerConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("TICKER_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from TICKER_CONFIG_PATH");
            return TickerConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from TICKER_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "TICKER_CONFIG_PATH set but file does not exist, using defaults"
        );
    }

    info!("No config file given, using built-in defaults");
    Ok(TickerConfig::default())
}

/// Run the ticker for `duration`, logging progress every `report_every`.
fn run(config: &TickerConfig, duration: Duration, report_every: Duration) -> Result<RunSummary> {
    let mut ticker = Ticker::new().context("Failed to claim the process timer")?;
    ticker
        .initialize(config.interval, on_tick)
        .context("Failed to initialize ticker")?;

    TICKS.reset();
    let started = Instant::now();
    ticker.start().context("Failed to start ticker")?;

    let report_every = report_every.max(Duration::from_millis(1));
    while started.elapsed() < duration {
        thread::sleep(report_every.min(duration.saturating_sub(started.elapsed())));
        let elapsed = started.elapsed();
        info!(
            ticks = TICKS.count(),
            expected = expected_ticks(config.interval, elapsed),
            elapsed_ms = elapsed.as_millis(),
            "Ticking"
        );
    }

    ticker.stop().context("Failed to stop ticker")?;
    let elapsed = started.elapsed();
    let ticks = TICKS.count();

    let outcome = ticker
        .shutdown(config.shutdown_wait)
        .context("Failed to shut down ticker")?;

    Ok(RunSummary::new(
        ticker.backend_kind(),
        ticker.current_signal_id().as_str(),
        config.interval,
        elapsed,
        ticks,
        outcome,
    ))
}
