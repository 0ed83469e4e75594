//! Binding of the tick signal to the runtime's callback.
//!
//! The handler runs in signal context, preempting whatever the interrupted
//! thread was doing. Callbacks must stay async-signal-safe: no allocation,
//! no locks, no blocking calls, no logging. Recording a flag or a counter
//! (see [`crate::tick::TickCounter`]) and deferring real work to ordinary
//! code is the intended pattern.

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use ticker_common::error::{TickerError, TickerResult};
use tracing::debug;

/// Identifier of the signal a backend delivers ticks on.
pub type SignalId = Signal;

/// Raw signal handler invoked once per tick, in signal context.
pub type TickCallback = extern "C" fn(libc::c_int);

/// Register `callback` as the handler for `signal`.
///
/// The handler's mask is empty and `SA_RESTART` is set, so blocking system
/// calls interrupted by a tick are restarted instead of failing with
/// `EINTR` in code that never expected it (line editors reading a tty are
/// the classic victim). Any previous handler for `signal` is replaced.
///
/// # Errors
///
/// Returns [`TickerError::HandlerInstall`] if `sigaction` fails. Callers in
/// the lifecycle treat this as fatal.
pub fn install_tick_handler(signal: SignalId, callback: TickCallback) -> TickerResult<()> {
    let action = SigAction::new(
        SigHandler::Handler(callback),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    // SAFETY: the handler is a plain `extern "C" fn`; its async-signal
    // safety is the caller's contract, documented on `TickCallback`.
    let previous = unsafe { sigaction(signal, &action) }.map_err(|e| {
        TickerError::HandlerInstall {
            primitive: "sigaction",
            reason: e.to_string(),
        }
    })?;

    debug!(
        signal = signal.as_str(),
        replaced_default = matches!(previous.handler(), SigHandler::SigDfl),
        "Tick handler installed"
    );
    Ok(())
}
