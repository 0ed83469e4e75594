//! Run summary for `tickerd`.

use serde::Serialize;
use std::time::Duration;
use ticker_runtime::{BackendKind, ShutdownOutcome};

/// What a ticker run observed.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Backend that generated ticks.
    pub backend: BackendKind,
    /// Signal ticks were delivered on.
    pub signal: &'static str,
    /// Configured interval in microseconds.
    pub interval_us: u64,
    /// Time between `start` and `stop` in microseconds.
    pub elapsed_us: u64,
    /// Ticks the callback recorded.
    pub ticks: u64,
    /// Ticks a perfect timer would have delivered.
    pub expected_ticks: u64,
    /// Result of releasing the timer.
    pub shutdown: ShutdownOutcome,
}

impl RunSummary {
    /// Build a summary, deriving the expected tick count.
    pub fn new(
        backend: BackendKind,
        signal: &'static str,
        interval: Duration,
        elapsed: Duration,
        ticks: u64,
        shutdown: ShutdownOutcome,
    ) -> Self {
        Self {
            backend,
            signal,
            interval_us: saturating_micros(interval),
            elapsed_us: saturating_micros(elapsed),
            ticks,
            expected_ticks: expected_ticks(interval, elapsed),
            shutdown,
        }
    }

    /// Observed ticks as a fraction of expected (1.0 is perfect).
    pub fn ratio(&self) -> f64 {
        if self.expected_ticks == 0 {
            return 0.0;
        }
        self.ticks as f64 / self.expected_ticks as f64
    }
}

/// Whole intervals that fit into `elapsed`.
pub fn expected_ticks(interval: Duration, elapsed: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    u64::try_from(elapsed.as_nanos() / interval.as_nanos()).unwrap_or(u64::MAX)
}

fn saturating_micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
