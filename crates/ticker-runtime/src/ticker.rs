//! The process ticker: one timer, one signal, one callback.
//!
//! Lifecycle: `initialize → start ⇄ stop → shutdown`, with re-initialization
//! allowed after shutdown. Lifecycle calls must be serialized by the owner;
//! no locking happens here. Ticks themselves arrive in signal context on
//! whichever thread the kernel picks.

use crate::backend::{BackendKind, TimerBackend};
use crate::fatal::escalate;
use crate::signal::{install_tick_handler, SignalId, TickCallback};
use serde::{Deserialize, Serialize};
use static_assertions::{assert_impl_all, assert_not_impl_any};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;
use ticker_common::error::{TickerError, TickerResult};
use ticker_common::state::{StateMachine, TickerState};
use ticker_common::time::TickInterval;
use tracing::{debug, error, info, warn};

/// Set while a [`Ticker`] exists in this process.
static TIMER_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Backend committed to by the first successful `initialize`.
///
/// Collaborators cache the tick signal to block it around critical
/// sections, so the backend (and with it the signal) never changes once
/// chosen, even across tickers.
static PROCESS_BACKEND: AtomicU8 = AtomicU8::new(UNPINNED);

const UNPINNED: u8 = 0;

fn backend_code(kind: BackendKind) -> u8 {
    match kind {
        BackendKind::Precise => 1,
        BackendKind::Legacy => 2,
    }
}

fn backend_from_code(code: u8) -> Option<BackendKind> {
    match code {
        1 => Some(BackendKind::Precise),
        2 => Some(BackendKind::Legacy),
        _ => None,
    }
}

/// Backend this process is committed to, if any ticker was initialized.
#[must_use]
pub fn process_backend() -> Option<BackendKind> {
    backend_from_code(PROCESS_BACKEND.load(Ordering::Acquire))
}

fn mismatch(fixed: BackendKind, requested: BackendKind) -> TickerError {
    TickerError::BackendMismatch {
        fixed: fixed.to_string(),
        requested: requested.to_string(),
    }
}

/// Fail unless `kind` agrees with the committed backend.
fn ensure_backend(kind: BackendKind) -> TickerResult<()> {
    match process_backend() {
        Some(fixed) if fixed != kind => Err(mismatch(fixed, kind)),
        _ => Ok(()),
    }
}

/// Commit the process to `kind`, or confirm it was already committed.
fn pin_backend(kind: BackendKind) -> TickerResult<()> {
    let code = backend_code(kind);
    match PROCESS_BACKEND.compare_exchange(UNPINNED, code, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            debug!(backend = %kind, "Process ticker backend fixed");
            Ok(())
        }
        Err(existing) if existing == code => Ok(()),
        Err(existing) => Err(backend_from_code(existing)
            .map_or(TickerError::AlreadyClaimed, |fixed| mismatch(fixed, kind))),
    }
}

/// Exclusive right to the process timer, released on drop.
#[derive(Debug)]
struct ProcessClaim(());

impl ProcessClaim {
    fn acquire() -> TickerResult<Self> {
        if TIMER_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TickerError::AlreadyClaimed);
        }
        Ok(Self(()))
    }
}

impl Drop for ProcessClaim {
    fn drop(&mut self) {
        TIMER_CLAIMED.store(false, Ordering::Release);
    }
}

/// What `shutdown` did with the timer resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// Resource released (or there was none to release).
    Released,
    /// The ticker was already shut down; nothing happened.
    AlreadyDestroyed,
    /// Releasing the resource failed. The ticker is still considered
    /// destroyed; the timer was disarmed first, but the kernel object may
    /// outlive it.
    ResourceLeaked(String),
}

/// Periodic tick source owned by the runtime's startup sequence.
///
/// At most one exists per process. The backend is detected when the first
/// ticker is constructed and, once a ticker initializes, stays fixed for
/// the rest of the process.
#[derive(Debug)]
pub struct Ticker {
    kind: BackendKind,
    machine: StateMachine,
    interval: Option<TickInterval>,
    backend: Option<Box<dyn TimerBackend>>,
    _claim: ProcessClaim,
}

assert_impl_all!(Ticker: Send);
assert_not_impl_any!(Ticker: Clone, Sync);

impl Ticker {
    /// Claim the process timer using the best backend available, or the
    /// backend an earlier ticker already committed the process to.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::AlreadyClaimed`] if another ticker is alive.
    pub fn new() -> TickerResult<Self> {
        Self::with_backend(process_backend().unwrap_or_else(BackendKind::detect))
    }

    /// Claim the process timer with a specific backend.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::BackendMismatch`] if the process is committed
    /// to another backend, and [`TickerError::AlreadyClaimed`] if another
    /// ticker is alive.
    pub(crate) fn with_backend(kind: BackendKind) -> TickerResult<Self> {
        ensure_backend(kind)?;
        let claim = ProcessClaim::acquire()?;
        info!(backend = %kind, signal = kind.signal().as_str(), "Ticker created");
        Ok(Self {
            kind,
            machine: StateMachine::new(),
            interval: None,
            backend: None,
            _claim: claim,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TickerState {
        self.machine.state()
    }

    /// Backend generating ticks.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    /// Interval stored by the last `initialize`, until shutdown.
    #[must_use]
    pub fn interval(&self) -> Option<TickInterval> {
        self.interval
    }

    /// Signal ticks are delivered on.
    ///
    /// Collaborators block and unblock this signal around critical sections.
    #[must_use]
    pub fn current_signal_id(&self) -> SignalId {
        self.kind.signal()
    }

    /// Store the interval, create the timer and bind `callback` to the tick
    /// signal.
    ///
    /// `callback` runs in signal context; see [`TickCallback`].
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidTransition`] unless the ticker is
    /// uninitialized or destroyed, [`TickerError::InvalidInterval`] for a
    /// zero interval, and [`TickerError::BackendMismatch`] if the process
    /// is committed to another backend. Timer creation and handler
    /// registration failures terminate the process.
    pub fn initialize(&mut self, interval: Duration, callback: TickCallback) -> TickerResult<()> {
        self.check(TickerState::Initialized)?;
        let interval = TickInterval::new(interval)?;
        pin_backend(self.kind)?;

        let backend = escalate(self.kind.create())?;
        escalate(install_tick_handler(self.kind.signal(), callback))?;

        self.interval = Some(interval);
        self.backend = Some(backend);
        self.machine.transition(TickerState::Initialized)?;

        info!(%interval, backend = %self.kind, "Ticker initialized");
        Ok(())
    }

    /// Arm the timer with the stored interval.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidTransition`] unless initialized or
    /// stopped. Arm failures terminate the process.
    pub fn start(&mut self) -> TickerResult<()> {
        self.check(TickerState::Running)?;
        let interval = self
            .interval
            .ok_or_else(|| self.missing(TickerState::Running))?;
        let backend = match self.backend.as_mut() {
            Some(backend) => backend,
            None => return Err(self.missing(TickerState::Running)),
        };

        escalate(backend.arm(interval))?;
        self.machine.transition(TickerState::Running)?;

        debug!(%interval, "Ticker started");
        Ok(())
    }

    /// Disarm the timer. The resource stays and `start` may be called again.
    ///
    /// Only future fires are prevented; a callback already executing is not
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidTransition`] unless running. Disarm
    /// failures terminate the process.
    pub fn stop(&mut self) -> TickerResult<()> {
        self.check(TickerState::Stopped)?;
        let backend = match self.backend.as_mut() {
            Some(backend) => backend,
            None => return Err(self.missing(TickerState::Stopped)),
        };

        escalate(backend.disarm())?;
        self.machine.transition(TickerState::Stopped)?;

        debug!("Ticker stopped");
        Ok(())
    }

    /// Release the timer resource.
    ///
    /// `wait` is advisory: ticks run in signal context, so a callback already
    /// in flight on another thread may still be finishing when this returns.
    /// Calling this again after shutdown is a no-op. Release failure is never
    /// fatal; it is reported through [`ShutdownOutcome::ResourceLeaked`].
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidTransition`] only if a live state has
    /// lost its backend, which indicates a bug rather than an OS failure.
    pub fn shutdown(&mut self, wait: bool) -> TickerResult<ShutdownOutcome> {
        if self.machine.state() == TickerState::Destroyed {
            debug!("Ticker already shut down");
            return Ok(ShutdownOutcome::AlreadyDestroyed);
        }

        if self.machine.state().holds_resource() && self.backend.is_none() {
            return Err(self.missing(TickerState::Destroyed));
        }

        let outcome = match self.backend.take() {
            Some(backend) => match backend.destroy() {
                Ok(()) => ShutdownOutcome::Released,
                Err(e) => {
                    warn!(
                        error = %e,
                        "Failed to release timer resource; it was disarmed but may leak"
                    );
                    ShutdownOutcome::ResourceLeaked(e.to_string())
                }
            },
            None => ShutdownOutcome::Released,
        };

        self.interval = None;
        self.machine.transition(TickerState::Destroyed)?;

        info!(wait, ?outcome, "Ticker shut down");
        Ok(outcome)
    }

    fn check(&self, target: TickerState) -> TickerResult<()> {
        self.machine.check(target).inspect_err(|e| {
            error!(error = %e, "Ticker lifecycle misuse");
        })
    }

    /// A live state without its interval or backend.
    fn missing(&self, target: TickerState) -> TickerError {
        error!(state = %self.machine.state(), "Ticker state is inconsistent");
        TickerError::InvalidTransition {
            from: self.machine.state().to_string(),
            to: target.to_string(),
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if self.machine.state().holds_resource() {
            let _ = self.shutdown(false);
        }
    }
}
