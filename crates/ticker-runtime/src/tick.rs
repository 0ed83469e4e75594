//! Async-signal-safe tick recording.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Lock-free tick recorder for use inside a [`crate::TickCallback`].
///
/// Lives in a `static`; the handler calls [`TickCounter::record`] and
/// ordinary code polls [`TickCounter::take_pending`] at its next safe
/// point. Fields sit on separate cache lines so the handler's stores do
/// not contend with the poller's loads.
#[derive(Debug)]
pub struct TickCounter {
    pending: CachePadded<AtomicBool>,
    count: CachePadded<AtomicU64>,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    /// Create a counter with no ticks recorded.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: CachePadded::new(AtomicBool::new(false)),
            count: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Record one tick. Safe to call from a signal handler.
    #[inline]
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
    }

    /// Total ticks recorded since creation or the last reset.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Whether a tick arrived since the last call, clearing the flag.
    #[inline]
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Clear both the count and the pending flag.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.pending.store(false, Ordering::Release);
    }
}
