//! Actor lifecycle state machine.
//!
//! States and the legal transitions between them:
//!
//! ```text
//! created ──► starting ──► running ──► stopping ──► stopped ──► terminated
//!    │            │      ▲    │  │         ▲           │
//!    ▼            ▼      │    │  ▼         │           ▼
//! terminated   failed ───┼────┼─►restarting┘(via failed/starting)
//!                        └────┘
//! ```
//!
//! Anything not in the table below is an [`ActorError::InvalidTransition`].

// Layer 1: Standard library imports
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Actor lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActorState {
    /// Constructed, `Start` not yet processed.
    Created = 0,
    /// `pre_start` in progress.
    Starting = 1,
    /// Processing messages.
    Running = 2,
    /// Draining / `post_stop` in progress.
    Stopping = 3,
    /// Stopped; may be deregistered or (in principle) started again.
    Stopped = 4,
    /// Supervised restart in progress.
    Restarting = 5,
    /// Failure acknowledged, heading for stop.
    Failed = 6,
    /// Deregistered. Final.
    Terminated = 7,
}

impl ActorState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            4 => Self::Stopped,
            5 => Self::Restarting,
            6 => Self::Failed,
            7 => Self::Terminated,
            _ => Self::Created,
        }
    }

    /// The transition table.
    pub fn can_transition_to(self, to: ActorState) -> bool {
        use ActorState::*;
        matches!(
            (self, to),
            (Created, Starting)
                | (Created, Terminated)
                | (Starting, Running)
                | (Starting, Failed)
                | (Starting, Stopping)
                | (Running, Stopping)
                | (Running, Restarting)
                | (Running, Failed)
                | (Stopping, Stopped)
                | (Stopping, Failed)
                | (Stopped, Starting)
                | (Stopped, Terminated)
                | (Restarting, Starting)
                | (Restarting, Failed)
                | (Restarting, Terminated)
                | (Failed, Stopping)
                | (Failed, Terminated)
        )
    }

    /// Whether no further transitions exist (`stopped` still admits a
    /// restart or teardown; only these two are dead ends for messages).
    pub fn is_terminal(self) -> bool {
        matches!(self, ActorState::Stopped | ActorState::Terminated)
    }

    /// Whether user messages are accepted in this state.
    pub fn accepts_user_messages(self) -> bool {
        matches!(
            self,
            ActorState::Created | ActorState::Starting | ActorState::Running
        )
    }
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorState::Created => "created",
            ActorState::Starting => "starting",
            ActorState::Running => "running",
            ActorState::Stopping => "stopping",
            ActorState::Stopped => "stopped",
            ActorState::Restarting => "restarting",
            ActorState::Failed => "failed",
            ActorState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActorError {
    /// Attempted a transition the table forbids.
    #[error("invalid actor state transition: {from} -> {to}")]
    InvalidTransition {
        /// State before the attempt.
        from: ActorState,
        /// Requested successor.
        to: ActorState,
    },
}

/// Atomic holder of an [`ActorState`], shared between the send path (which
/// gates on it) and the processing task (which drives it).
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Start in `Created`.
    pub fn new() -> Self {
        Self(AtomicU8::new(ActorState::Created as u8))
    }

    /// Current state.
    pub fn current(&self) -> ActorState {
        // Acquire: pairs with the Release in `transition_to`, so state
        // observations also see the work done before the transition.
        ActorState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Attempt the transition `current -> to`, validating it against the
    /// table. Returns the previous state on success.
    pub fn transition_to(&self, to: ActorState) -> Result<ActorState, ActorError> {
        let mut current = self.current();
        loop {
            if !current.can_transition_to(to) {
                return Err(ActorError::InvalidTransition { from: current, to });
            }
            // AcqRel: Release publishes pre-transition effects, Acquire on
            // the reloaded value keeps the retry race-coherent.
            match self.0.compare_exchange(
                current as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(prev) => return Ok(ActorState::from_u8(prev)),
                Err(observed) => current = ActorState::from_u8(observed),
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(StateCell::new().current(), ActorState::Created);
    }

    #[test]
    fn test_happy_path() {
        let cell = StateCell::new();
        cell.transition_to(ActorState::Starting).unwrap();
        cell.transition_to(ActorState::Running).unwrap();
        cell.transition_to(ActorState::Stopping).unwrap();
        cell.transition_to(ActorState::Stopped).unwrap();
        cell.transition_to(ActorState::Terminated).unwrap();
        assert_eq!(cell.current(), ActorState::Terminated);
    }

    #[test]
    fn test_restart_cycle() {
        let cell = StateCell::new();
        cell.transition_to(ActorState::Starting).unwrap();
        cell.transition_to(ActorState::Running).unwrap();
        cell.transition_to(ActorState::Restarting).unwrap();
        cell.transition_to(ActorState::Starting).unwrap();
        cell.transition_to(ActorState::Running).unwrap();
    }

    #[test]
    fn test_failure_path() {
        let cell = StateCell::new();
        cell.transition_to(ActorState::Starting).unwrap();
        cell.transition_to(ActorState::Running).unwrap();
        cell.transition_to(ActorState::Failed).unwrap();
        cell.transition_to(ActorState::Stopping).unwrap();
        cell.transition_to(ActorState::Stopped).unwrap();
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let cell = StateCell::new();
        assert_eq!(
            cell.transition_to(ActorState::Running),
            Err(ActorError::InvalidTransition {
                from: ActorState::Created,
                to: ActorState::Running,
            })
        );
        // State unchanged after a rejected transition.
        assert_eq!(cell.current(), ActorState::Created);
    }

    #[test]
    fn test_terminated_is_final() {
        let cell = StateCell::new();
        cell.transition_to(ActorState::Terminated).unwrap();
        for to in [
            ActorState::Starting,
            ActorState::Running,
            ActorState::Stopping,
            ActorState::Stopped,
            ActorState::Restarting,
            ActorState::Failed,
            ActorState::Created,
        ] {
            assert!(cell.transition_to(to).is_err(), "terminated -> {to}");
        }
    }

    #[test]
    fn test_message_acceptance() {
        assert!(ActorState::Created.accepts_user_messages());
        assert!(ActorState::Starting.accepts_user_messages());
        assert!(ActorState::Running.accepts_user_messages());
        assert!(!ActorState::Stopping.accepts_user_messages());
        assert!(!ActorState::Stopped.accepts_user_messages());
        assert!(!ActorState::Failed.accepts_user_messages());
        assert!(!ActorState::Terminated.accepts_user_messages());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ActorState::Stopped.is_terminal());
        assert!(ActorState::Terminated.is_terminal());
        assert!(!ActorState::Failed.is_terminal());
        assert!(!ActorState::Stopping.is_terminal());
    }

    #[test]
    fn test_stopped_can_start_again() {
        let cell = StateCell::new();
        cell.transition_to(ActorState::Starting).unwrap();
        cell.transition_to(ActorState::Running).unwrap();
        cell.transition_to(ActorState::Stopping).unwrap();
        cell.transition_to(ActorState::Stopped).unwrap();
        cell.transition_to(ActorState::Starting).unwrap();
    }
}
