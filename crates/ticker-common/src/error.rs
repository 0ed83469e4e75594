use thiserror::Error;

/// Ticker error types covering OS timer failures and lifecycle misuse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TickerError {
    /// The backend timer object could not be created.
    #[error("{primitive}: {reason}")]
    ResourceCreation {
        /// Failing OS primitive (e.g. `timer_create`).
        primitive: &'static str,
        /// OS error description.
        reason: String,
    },

    /// The tick signal handler could not be registered.
    #[error("{primitive}: {reason}")]
    HandlerInstall {
        /// Failing OS primitive (e.g. `sigaction`).
        primitive: &'static str,
        /// OS error description.
        reason: String,
    },

    /// The timer could not be armed.
    #[error("{primitive}: {reason}")]
    Arm {
        /// Failing OS primitive (e.g. `timer_settime`).
        primitive: &'static str,
        /// OS error description.
        reason: String,
    },

    /// The timer could not be disarmed.
    #[error("{primitive}: {reason}")]
    Disarm {
        /// Failing OS primitive.
        primitive: &'static str,
        /// OS error description.
        reason: String,
    },

    /// Releasing the timer object failed during shutdown.
    #[error("{primitive}: {reason}")]
    ResourceDeletion {
        /// Failing OS primitive (e.g. `timer_delete`).
        primitive: &'static str,
        /// OS error description.
        reason: String,
    },

    /// Tick interval must be strictly positive.
    #[error("invalid tick interval: {0}")]
    InvalidInterval(String),

    /// Lifecycle operation invoked from a state that does not allow it.
    #[error("invalid ticker transition from {from} to {to}")]
    InvalidTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The process already committed to a different backend.
    #[error("ticker backend is fixed to {fixed} for this process, cannot use {requested}")]
    BackendMismatch {
        /// Backend chosen by the first initialization.
        fixed: String,
        /// Backend that was asked for.
        requested: String,
    },

    /// Another ticker already owns the process timer.
    #[error("a ticker is already active in this process")]
    AlreadyClaimed,
}

impl TickerError {
    /// Whether this error must terminate the process.
    ///
    /// A ticker that cannot be created, bound to its signal, or (dis)armed
    /// would silently break preemption and profiling, so these never
    /// propagate as recoverable values past the lifecycle layer.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ResourceCreation { .. }
                | Self::HandlerInstall { .. }
                | Self::Arm { .. }
                | Self::Disarm { .. }
        )
    }

    /// Name of the OS primitive that failed, if any.
    #[must_use]
    pub fn primitive(&self) -> Option<&'static str> {
        match self {
            Self::ResourceCreation { primitive, .. }
            | Self::HandlerInstall { primitive, .. }
            | Self::Arm { primitive, .. }
            | Self::Disarm { primitive, .. }
            | Self::ResourceDeletion { primitive, .. } => Some(primitive),
            _ => None,
        }
    }
}

/// Convenience type alias for ticker operations.
pub type TickerResult<T> = Result<T, TickerError>;
