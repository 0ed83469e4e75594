//! End-to-end ticker scenario.
//!
//! # Acceptance Criteria
//!
//! - 10ms ticker observed for 105ms delivers 9..=11 ticks
//! - No tick arrives after `stop` returns
//! - `shutdown` succeeds and ticks never resume

use super::common::{exclusive, intervals_in, intervals_in_ceil, on_tick, TICKS};
use std::thread;
use std::time::{Duration, Instant};
use ticker_common::state::TickerState;
use ticker_runtime::{ShutdownOutcome, Ticker};

#[test]
fn test_counter_scenario() {
    let _guard = exclusive();
    let interval = Duration::from_millis(10);

    let mut ticker = Ticker::new().unwrap();
    ticker.initialize(interval, on_tick).unwrap();

    let started = Instant::now();
    ticker.start().unwrap();
    thread::sleep(Duration::from_millis(105));
    ticker.stop().unwrap();
    let elapsed = started.elapsed();

    // 105ms nominal; a loaded host may oversleep, which can only add ticks.
    let observed = TICKS.count();
    let upper = intervals_in_ceil(elapsed, interval).max(11);
    assert!(
        (9..=upper).contains(&observed),
        "observed {observed} ticks in {elapsed:?}, expected 9..={upper}"
    );

    thread::sleep(Duration::from_millis(50));
    assert_eq!(TICKS.count(), observed, "tick after stop");

    assert_eq!(ticker.shutdown(false).unwrap(), ShutdownOutcome::Released);
    assert_eq!(ticker.state(), TickerState::Destroyed);

    for _ in 0..3 {
        thread::sleep(Duration::from_millis(20));
        assert_eq!(TICKS.count(), observed, "tick after shutdown");
    }
}

#[test]
fn test_cadence_bounds_across_intervals() {
    let _guard = exclusive();

    for interval_ms in [2u64, 5, 20] {
        let interval = Duration::from_millis(interval_ms);
        let window = interval * 12;

        let mut ticker = Ticker::new().unwrap();
        ticker.initialize(interval, on_tick).unwrap();

        let before = TICKS.count();
        let started = Instant::now();
        ticker.start().unwrap();
        thread::sleep(window);
        ticker.stop().unwrap();
        let elapsed = started.elapsed();
        let ticks = TICKS.count() - before;

        let lower = intervals_in(window, interval) - 1;
        let upper = intervals_in_ceil(elapsed, interval) + 1;
        assert!(
            (lower..=upper).contains(&ticks),
            "{ticks} ticks at {interval:?} over {elapsed:?}, expected {lower}..={upper}"
        );

        ticker.shutdown(false).unwrap();
    }
}

#[test]
fn test_repeated_shutdown_is_harmless() {
    let _guard = exclusive();

    let mut ticker = Ticker::new().unwrap();
    ticker.initialize(Duration::from_millis(5), on_tick).unwrap();
    ticker.start().unwrap();
    thread::sleep(Duration::from_millis(20));
    ticker.stop().unwrap();

    assert_eq!(ticker.shutdown(false).unwrap(), ShutdownOutcome::Released);
    assert_eq!(
        ticker.shutdown(false).unwrap(),
        ShutdownOutcome::AlreadyDestroyed
    );
}
