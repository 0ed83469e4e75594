//! Common utilities for acceptance tests.
//!
//! Signals and the ticker claim are process-wide, so every test holds the
//! guard returned by [`exclusive`] for its whole body.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use ticker_common::time::TickInterval;
use ticker_runtime::{install_tick_handler, BackendKind, TickCounter, TimerBackend};

static SERIAL: Mutex<()> = Mutex::new(());

/// Ticks recorded by [`on_tick`].
pub static TICKS: TickCounter = TickCounter::new();

/// Tick callback used by every acceptance test.
pub extern "C" fn on_tick(_: libc::c_int) {
    TICKS.record();
}

/// Serialize the calling test and clear the tick counter.
pub fn exclusive() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    TICKS.reset();
    guard
}

/// Ticks observed while a backend ran for a fixed window.
#[derive(Debug, Clone, Copy)]
pub struct CadenceSample {
    /// Backend measured.
    pub backend: BackendKind,
    /// Ticks counted between start and stop.
    pub ticks: u64,
    /// Measured time between start and stop.
    pub elapsed: Duration,
}

/// Arm `backend` directly, run for `window`, then disarm and release it.
///
/// The process ticker commits to a single backend, so comparing backends
/// goes underneath it.
pub fn sample_cadence(backend: BackendKind, interval: Duration, window: Duration) -> CadenceSample {
    let mut timer = backend.create().unwrap();
    install_tick_handler(timer.signal(), on_tick).unwrap();

    let before = TICKS.count();
    let started = Instant::now();
    timer.arm(TickInterval::new(interval).unwrap()).unwrap();
    thread::sleep(window);
    timer.disarm().unwrap();
    let elapsed = started.elapsed();
    let ticks = TICKS.count() - before;

    timer.destroy().unwrap();
    CadenceSample {
        backend,
        ticks,
        elapsed,
    }
}

/// Whole intervals in `d`.
pub fn intervals_in(d: Duration, interval: Duration) -> u64 {
    (d.as_nanos() / interval.as_nanos()) as u64
}

/// Intervals in `d`, rounded up.
pub fn intervals_in_ceil(d: Duration, interval: Duration) -> u64 {
    d.as_nanos().div_ceil(interval.as_nanos()) as u64
}

/// Backends this platform can run.
pub fn available_backends() -> Vec<BackendKind> {
    if BackendKind::detect() == BackendKind::Precise {
        vec![BackendKind::Precise, BackendKind::Legacy]
    } else {
        vec![BackendKind::Legacy]
    }
}
