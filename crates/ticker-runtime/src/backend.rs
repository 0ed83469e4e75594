//! Timer backends that generate the periodic tick signal.
//!
//! Two mutually exclusive strategies:
//!
//! - **Precise**: a POSIX timer object (`timer_create`) on the monotonic
//!   clock, delivering `SIGVTALRM`. Nanosecond granularity.
//! - **Legacy**: the process interval timer (`setitimer(ITIMER_REAL)`),
//!   realtime clock only, delivering `SIGALRM`. Microsecond granularity, no
//!   object to release.
//!
//! Precise timers are compiled in on Linux, Android and FreeBSD, where
//! `timer_t` is a pointer handle; elsewhere [`BackendKind::detect`] falls
//! back to the legacy timer. The choice is made once per process by the
//! first [`crate::Ticker`] to initialize. Both variants share the
//! [`TimerBackend`] contract: after `arm`, the bound signal fires every
//! interval until `disarm`.

use nix::errno::Errno;
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ticker_common::error::{TickerError, TickerResult};
use ticker_common::time::{SecsMicros, SecsNanos, TickInterval};
use tracing::{debug, warn};

/// Which OS facility generates ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// POSIX timer object on a monotonic clock.
    Precise,
    /// `setitimer` interval timer on the realtime clock.
    Legacy,
}

impl BackendKind {
    /// Pick the best backend the platform offers.
    #[must_use]
    pub fn detect() -> Self {
        if PreciseTimer::SUPPORTED {
            Self::Precise
        } else {
            Self::Legacy
        }
    }

    /// Signal this backend delivers ticks on.
    ///
    /// Precise timers can use a dedicated signal. The legacy interval timer
    /// is hard-wired by the kernel to `SIGALRM`, which collides with anything
    /// else in the process that uses `alarm(2)`.
    #[must_use]
    pub fn signal(self) -> Signal {
        match self {
            Self::Precise => Signal::SIGVTALRM,
            Self::Legacy => Signal::SIGALRM,
        }
    }

    /// Create the backend resource for this kind.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::ResourceCreation`] if the timer object cannot
    /// be created.
    pub fn create(self) -> TickerResult<Box<dyn TimerBackend>> {
        match self {
            Self::Precise => Ok(Box::new(PreciseTimer::create(self.signal())?)),
            Self::Legacy => Ok(Box::new(LegacyTimer::new())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precise => write!(f, "precise"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// A source of periodic tick signals.
pub trait TimerBackend: Send + fmt::Debug {
    /// Which facility this is.
    fn kind(&self) -> BackendKind;

    /// Signal delivered on each tick.
    fn signal(&self) -> Signal {
        self.kind().signal()
    }

    /// Fire one interval from now, then every interval.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::Arm`] if the OS rejects the setting.
    fn arm(&mut self, interval: TickInterval) -> TickerResult<()>;

    /// Cancel future fires without releasing the resource.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::Disarm`] if the OS rejects the setting.
    fn disarm(&mut self) -> TickerResult<()>;

    /// Release the resource.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::ResourceDeletion`] on failure; callers treat
    /// it as best effort.
    fn destroy(self: Box<Self>) -> TickerResult<()>;
}

/// Clock driving a precise timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// Unaffected by wall-clock adjustments (NTP slews, leap seconds).
    Monotonic,
    /// Wall clock; only used when no monotonic clock exists.
    Realtime,
}

impl ClockSource {
    /// Prefer the monotonic clock if the system exposes one.
    #[must_use]
    pub fn detect() -> Self {
        use nix::time::{clock_getres, ClockId};

        if clock_getres(ClockId::CLOCK_MONOTONIC).is_ok() {
            Self::Monotonic
        } else {
            Self::Realtime
        }
    }

    fn raw(self) -> libc::clockid_t {
        match self {
            Self::Monotonic => libc::CLOCK_MONOTONIC,
            Self::Realtime => libc::CLOCK_REALTIME,
        }
    }
}

fn timespec(value: SecsNanos) -> libc::timespec {
    // SAFETY: timespec is plain data; zeroing covers padding on 32-bit ABIs.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    ts.tv_sec = libc::time_t::try_from(value.secs).unwrap_or(libc::time_t::MAX);
    ts.tv_nsec = value.nanos as _;
    ts
}

fn timeval(value: SecsMicros) -> libc::timeval {
    // SAFETY: timeval is plain data.
    let mut tv: libc::timeval = unsafe { std::mem::zeroed() };
    tv.tv_sec = libc::time_t::try_from(value.secs).unwrap_or(libc::time_t::MAX);
    tv.tv_usec = value.micros as _;
    tv
}

/// Owned `timer_t`.
#[derive(Debug)]
struct TimerId(libc::timer_t);

// SAFETY: a timer_t is a kernel handle; any thread may program or delete it.
unsafe impl Send for TimerId {}

/// POSIX timer object delivering a signal on every expiry.
#[derive(Debug)]
pub struct PreciseTimer {
    id: Option<TimerId>,
    clock: ClockSource,
    signal: Signal,
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
impl PreciseTimer {
    /// Whether this platform provides `timer_create`.
    pub const SUPPORTED: bool = true;

    /// Create a disarmed timer that will deliver `signal`.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::ResourceCreation`] if `timer_create` fails.
    pub fn create(signal: Signal) -> TickerResult<Self> {
        let clock = ClockSource::detect();

        // Fully zeroed so no uninitialised union bytes reach the kernel.
        // SAFETY: sigevent is plain data.
        let mut event: libc::sigevent = unsafe { std::mem::zeroed() };
        event.sigev_notify = libc::SIGEV_SIGNAL;
        event.sigev_signo = signal as libc::c_int;

        let mut raw: libc::timer_t = std::ptr::null_mut();
        // SAFETY: both pointers are valid for the duration of the call.
        Errno::result(unsafe { libc::timer_create(clock.raw(), &mut event, &mut raw) }).map_err(
            |e| TickerError::ResourceCreation {
                primitive: "timer_create",
                reason: e.to_string(),
            },
        )?;

        debug!(?clock, signal = signal.as_str(), "Precise timer created");
        Ok(Self {
            id: Some(TimerId(raw)),
            clock,
            signal,
        })
    }

    fn settime(&self, value: SecsNanos) -> Result<(), Errno> {
        let Some(id) = &self.id else {
            return Err(Errno::EINVAL);
        };
        let period = timespec(value);
        let spec = libc::itimerspec {
            it_interval: period,
            it_value: period,
        };
        // SAFETY: `id` is a live timer owned by self; `spec` outlives the call.
        Errno::result(unsafe { libc::timer_settime(id.0, 0, &spec, std::ptr::null_mut()) })
            .map(drop)
    }

    fn delete(&mut self) -> Result<(), Errno> {
        match self.id.take() {
            // SAFETY: the handle is taken out of self, so it is deleted once.
            Some(id) => Errno::result(unsafe { libc::timer_delete(id.0) }).map(drop),
            None => Ok(()),
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
impl PreciseTimer {
    /// Whether this platform provides `timer_create`.
    pub const SUPPORTED: bool = false;

    /// Precise timers are not available on this platform.
    ///
    /// # Errors
    ///
    /// Always returns [`TickerError::ResourceCreation`].
    pub fn create(_signal: Signal) -> TickerResult<Self> {
        Err(TickerError::ResourceCreation {
            primitive: "timer_create",
            reason: "not available on this platform".into(),
        })
    }

    fn settime(&self, _value: SecsNanos) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    fn delete(&mut self) -> Result<(), Errno> {
        self.id = None;
        Ok(())
    }
}

impl PreciseTimer {
    /// Disarm ahead of deletion. Failure is logged, not returned: deletion
    /// proceeds either way.
    fn quiesce(&self) -> Result<(), Errno> {
        self.settime(SecsNanos::ZERO).inspect_err(|e| {
            warn!(error = %e, "Failed to disarm precise timer before deletion");
        })
    }

    /// Clock the timer counts against.
    #[must_use]
    pub fn clock(&self) -> ClockSource {
        self.clock
    }
}

impl TimerBackend for PreciseTimer {
    fn kind(&self) -> BackendKind {
        BackendKind::Precise
    }

    fn signal(&self) -> Signal {
        self.signal
    }

    fn arm(&mut self, interval: TickInterval) -> TickerResult<()> {
        let value = interval.to_secs_nanos();
        self.settime(value).map_err(|e| TickerError::Arm {
            primitive: "timer_settime",
            reason: e.to_string(),
        })?;
        debug!(secs = value.secs, nanos = value.nanos, "Precise timer armed");
        Ok(())
    }

    fn disarm(&mut self) -> TickerResult<()> {
        self.settime(SecsNanos::ZERO)
            .map_err(|e| TickerError::Disarm {
                primitive: "timer_settime",
                reason: e.to_string(),
            })?;
        debug!("Precise timer disarmed");
        Ok(())
    }

    fn destroy(mut self: Box<Self>) -> TickerResult<()> {
        // Disarm first: if the delete below fails, a leaked timer must at
        // least stop firing.
        let _ = self.quiesce();
        self.delete().map_err(|e| TickerError::ResourceDeletion {
            primitive: "timer_delete",
            reason: e.to_string(),
        })?;
        debug!("Precise timer deleted");
        Ok(())
    }
}

impl Drop for PreciseTimer {
    fn drop(&mut self) {
        let _ = self.delete();
    }
}

/// Process interval timer (`ITIMER_REAL`).
///
/// There is exactly one per process and no handle to release, so destroying
/// it is the same as disarming it.
#[derive(Debug, Default)]
pub struct LegacyTimer {
    armed: bool,
}

impl LegacyTimer {
    /// Wrap the process interval timer. Does not touch it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn setitimer(value: SecsMicros) -> Result<(), Errno> {
        let period = timeval(value);
        let spec = libc::itimerval {
            it_interval: period,
            it_value: period,
        };
        // SAFETY: `spec` outlives the call; the old value is not requested.
        Errno::result(unsafe { libc::setitimer(libc::ITIMER_REAL, &spec, std::ptr::null_mut()) })
            .map(drop)
    }
}

impl TimerBackend for LegacyTimer {
    fn kind(&self) -> BackendKind {
        BackendKind::Legacy
    }

    fn arm(&mut self, interval: TickInterval) -> TickerResult<()> {
        let mut value = interval.to_secs_micros();
        if value == SecsMicros::ZERO {
            // Sub-microsecond interval: zero would disarm, use the finest step.
            value.micros = 1;
        }
        Self::setitimer(value).map_err(|e| TickerError::Arm {
            primitive: "setitimer",
            reason: e.to_string(),
        })?;
        self.armed = true;
        debug!(secs = value.secs, micros = value.micros, "Interval timer armed");
        Ok(())
    }

    fn disarm(&mut self) -> TickerResult<()> {
        Self::setitimer(SecsMicros::ZERO).map_err(|e| TickerError::Disarm {
            primitive: "setitimer",
            reason: e.to_string(),
        })?;
        self.armed = false;
        debug!("Interval timer disarmed");
        Ok(())
    }

    fn destroy(mut self: Box<Self>) -> TickerResult<()> {
        if !self.armed {
            return Ok(());
        }
        self.disarm().map_err(|e| TickerError::ResourceDeletion {
            primitive: "setitimer",
            reason: e.to_string(),
        })
    }
}
