//! Ticker lifecycle state machine.
//!
//! UNINITIALIZED → INITIALIZED → RUNNING ⇄ STOPPED → DESTROYED
//!
//! Shutdown is reachable from every live state, and a destroyed ticker may
//! be initialized again.

use crate::error::{TickerError, TickerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of the process ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TickerState {
    /// No interval, no handler, no timer object.
    #[default]
    Uninitialized,
    /// Handler installed and timer created, not armed yet.
    Initialized,
    /// Timer armed; ticks are being delivered.
    Running,
    /// Timer disarmed, resource retained.
    Stopped,
    /// Resource released.
    Destroyed,
}

impl fmt::Display for TickerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "UNINITIALIZED"),
            Self::Initialized => write!(f, "INITIALIZED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Destroyed => write!(f, "DESTROYED"),
        }
    }
}

impl TickerState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: TickerState) -> bool {
        use TickerState::{Destroyed, Initialized, Running, Stopped, Uninitialized};

        matches!(
            (self, target),
            // initialize
            (Uninitialized | Destroyed, Initialized)
                // start
                | (Initialized | Stopped, Running)
                // stop
                | (Running, Stopped)
                // shutdown
                | (Uninitialized | Initialized | Running | Stopped, Destroyed)
        )
    }

    /// Returns true while a timer object may exist.
    #[must_use]
    pub fn holds_resource(&self) -> bool {
        matches!(self, Self::Initialized | Self::Running | Self::Stopped)
    }
}

/// Current lifecycle state, changed only through checked transitions.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    current: TickerState,
}

impl StateMachine {
    /// Create a new state machine starting in UNINITIALIZED.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    #[must_use]
    pub fn state(&self) -> TickerState {
        self.current
    }

    /// Check a transition without performing it.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidTransition`] if `target` is unreachable.
    pub fn check(&self, target: TickerState) -> TickerResult<()> {
        if self.current.can_transition_to(target) {
            Ok(())
        } else {
            Err(TickerError::InvalidTransition {
                from: self.current.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Attempt a state transition.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidTransition`] if `target` is unreachable.
    pub fn transition(&mut self, target: TickerState) -> TickerResult<()> {
        self.check(target)?;
        self.current = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.state(), TickerState::Uninitialized);

        sm.transition(TickerState::Initialized).unwrap();
        sm.transition(TickerState::Running).unwrap();
        sm.transition(TickerState::Stopped).unwrap();
        sm.transition(TickerState::Running).unwrap();
        sm.transition(TickerState::Stopped).unwrap();
        sm.transition(TickerState::Destroyed).unwrap();

        assert_eq!(sm.state(), TickerState::Destroyed);
    }

    #[test]
    fn test_start_before_initialize() {
        let mut sm = StateMachine::new();
        let result = sm.transition(TickerState::Running);
        assert_eq!(
            result,
            Err(TickerError::InvalidTransition {
                from: "UNINITIALIZED".into(),
                to: "RUNNING".into(),
            })
        );
        assert_eq!(sm.state(), TickerState::Uninitialized);
    }

    #[test]
    fn test_stop_requires_running() {
        let mut sm = StateMachine::new();
        sm.transition(TickerState::Initialized).unwrap();
        assert!(sm.check(TickerState::Stopped).is_err());
        assert!(sm.transition(TickerState::Stopped).is_err());
        assert_eq!(sm.state(), TickerState::Initialized);
    }

    #[test]
    fn test_double_initialize_rejected() {
        let mut sm = StateMachine::new();
        sm.transition(TickerState::Initialized).unwrap();
        assert!(sm.transition(TickerState::Initialized).is_err());
    }

    #[test]
    fn test_shutdown_from_any_live_state() {
        for from in [
            TickerState::Uninitialized,
            TickerState::Initialized,
            TickerState::Running,
            TickerState::Stopped,
        ] {
            assert!(from.can_transition_to(TickerState::Destroyed), "{from}");
        }
        assert!(!TickerState::Destroyed.can_transition_to(TickerState::Destroyed));
    }

    #[test]
    fn test_reinitialize_after_destroy() {
        let mut sm = StateMachine::new();
        sm.transition(TickerState::Initialized).unwrap();
        sm.transition(TickerState::Destroyed).unwrap();

        assert!(sm.transition(TickerState::Running).is_err());
        assert!(sm.transition(TickerState::Initialized).is_ok());
        assert_eq!(sm.state(), TickerState::Initialized);
    }

    #[test]
    fn test_holds_resource() {
        assert!(!TickerState::Uninitialized.holds_resource());
        assert!(TickerState::Running.holds_resource());
        assert!(!TickerState::Destroyed.holds_resource());
    }
}
