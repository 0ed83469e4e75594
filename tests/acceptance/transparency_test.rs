//! Backend-selection transparency.
//!
//! # Acceptance Criteria
//!
//! - Each backend stays within the cadence bounds on its own
//! - Precise and legacy backends deliver the same number of ticks for the
//!   same interval, within scheduling noise

use super::common::{available_backends, exclusive, intervals_in, intervals_in_ceil, sample_cadence};
use std::time::Duration;
use ticker_runtime::BackendKind;

const INTERVAL: Duration = Duration::from_millis(5);
const WINDOW: Duration = Duration::from_millis(300);

#[test]
fn test_each_backend_within_bounds() {
    let _guard = exclusive();

    for backend in available_backends() {
        let sample = sample_cadence(backend, INTERVAL, WINDOW);
        let lower = intervals_in(WINDOW, INTERVAL) - 1;
        let upper = intervals_in_ceil(sample.elapsed, INTERVAL) + 1;
        assert!(
            (lower..=upper).contains(&sample.ticks),
            "{sample:?} outside {lower}..={upper}"
        );
    }
}

#[test]
fn test_backends_indistinguishable() {
    let _guard = exclusive();

    if BackendKind::detect() != BackendKind::Precise {
        // Only the legacy backend exists here; nothing to compare.
        return;
    }

    let precise = sample_cadence(BackendKind::Precise, INTERVAL, WINDOW);
    let legacy = sample_cadence(BackendKind::Legacy, INTERVAL, WINDOW);

    // Normalize by each run's own elapsed time before comparing.
    let rate = |ticks: u64, elapsed: Duration| ticks as f64 / elapsed.as_secs_f64();
    let precise_rate = rate(precise.ticks, precise.elapsed);
    let legacy_rate = rate(legacy.ticks, legacy.elapsed);
    let nominal = 1.0 / INTERVAL.as_secs_f64();

    assert!(
        (precise_rate - legacy_rate).abs() <= nominal * 0.15,
        "precise {precise_rate:.1}/s vs legacy {legacy_rate:.1}/s (nominal {nominal:.1}/s)"
    );
}
