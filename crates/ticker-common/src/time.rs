//! Tick interval and its conversions into the OS timer representations.
//!
//! The precise backend programs a `timespec` (seconds + nanoseconds), the
//! legacy backend a `timeval` (seconds + microseconds). Both split a
//! [`Duration`] by truncation; no rounding is ever applied.

use crate::error::{TickerError, TickerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;
const MICROS_PER_SEC: u128 = 1_000_000;

/// Whole seconds plus a nanosecond remainder (`< 1_000_000_000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecsNanos {
    /// Whole seconds.
    pub secs: u64,
    /// Sub-second remainder in nanoseconds.
    pub nanos: u32,
}

impl SecsNanos {
    /// The all-zero value, which disarms a timer.
    pub const ZERO: Self = Self { secs: 0, nanos: 0 };

    /// Reconstruct the duration.
    #[must_use]
    pub fn to_duration(self) -> Duration {
        Duration::new(self.secs, self.nanos)
    }
}

/// Whole seconds plus a microsecond remainder (`< 1_000_000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecsMicros {
    /// Whole seconds.
    pub secs: u64,
    /// Sub-second remainder in microseconds.
    pub micros: u32,
}

impl SecsMicros {
    /// The all-zero value, which disarms a timer.
    pub const ZERO: Self = Self { secs: 0, micros: 0 };

    /// Reconstruct the duration.
    #[must_use]
    pub fn to_duration(self) -> Duration {
        Duration::from_secs(self.secs) + Duration::from_micros(u64::from(self.micros))
    }
}

/// Split a duration into seconds and `total_nanoseconds mod 1e9`.
#[must_use]
pub fn to_secs_nanos(duration: Duration) -> SecsNanos {
    let total = duration.as_nanos();
    SecsNanos {
        secs: duration.as_secs(),
        // Always < 1e9, fits in u32.
        nanos: (total % NANOS_PER_SEC) as u32,
    }
}

/// Split a duration into seconds and `total_microseconds mod 1e6`.
#[must_use]
pub fn to_secs_micros(duration: Duration) -> SecsMicros {
    let total = duration.as_micros();
    SecsMicros {
        secs: duration.as_secs(),
        micros: (total % MICROS_PER_SEC) as u32,
    }
}

/// Period between successive ticks. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickInterval(Duration);

impl TickInterval {
    /// Interval used when the owning runtime does not choose one.
    pub const DEFAULT: Self = Self(Duration::from_millis(10));

    /// Create a tick interval.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidInterval`] for a zero duration; arming a
    /// timer with zero would disarm it instead.
    pub fn new(duration: Duration) -> TickerResult<Self> {
        if duration.is_zero() {
            return Err(TickerError::InvalidInterval(
                "interval must be greater than zero".into(),
            ));
        }
        Ok(Self(duration))
    }

    /// The interval as a plain duration.
    #[inline]
    #[must_use]
    pub fn as_duration(self) -> Duration {
        self.0
    }

    /// Representation for the precise (timer object) backend.
    #[inline]
    #[must_use]
    pub fn to_secs_nanos(self) -> SecsNanos {
        to_secs_nanos(self.0)
    }

    /// Representation for the legacy (interval timer) backend.
    ///
    /// Sub-microsecond intervals truncate to zero here; the legacy backend
    /// clamps those to one microsecond so they still arm.
    #[inline]
    #[must_use]
    pub fn to_secs_micros(self) -> SecsMicros {
        to_secs_micros(self.0)
    }
}

impl Default for TickInterval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<Duration> for TickInterval {
    type Error = TickerError;

    fn try_from(duration: Duration) -> TickerResult<Self> {
        Self::new(duration)
    }
}

impl fmt::Display for TickInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}
