//! Supervision: failure strategies and the restart budget.

// Layer 1: Standard library imports
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// How a failure in `receive` is handled.
///
/// Returned by [`Behavior::supervisor_strategy`](crate::actor::Behavior::supervisor_strategy);
/// also consulted by a parent when a descendant escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisorStrategy {
    /// Stop the actor permanently.
    Stop,
    /// Rebuild the behavior from its factory and keep going.
    Restart,
    /// Ignore the failure and process the next message.
    Resume,
    /// Let the parent's strategy decide.
    Escalate,
}

impl Default for SupervisorStrategy {
    fn default() -> Self {
        Self::Restart
    }
}

/// Restart budget: at most `max_restarts` within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPolicy {
    /// Restarts tolerated inside one window.
    pub max_restarts: u32,
    /// Width of the sliding window.
    pub window: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 3,
            window: Duration::from_millis(60_000),
        }
    }
}

/// Supervision failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SupervisionError {
    /// The restart budget is exhausted; the actor stops.
    #[error("restart limit exceeded: {max} restarts within {window:?}")]
    RestartLimitExceeded {
        /// The budget that was exceeded.
        max: u32,
        /// The window it applied to.
        window: Duration,
    },
}

/// Sliding-window restart counter, owned by one actor cell.
#[derive(Debug)]
pub(crate) struct RestartWindow {
    count: u32,
    window_start: Instant,
}

impl RestartWindow {
    pub(crate) fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Account one restart attempt against the budget. Returns the restart
    /// number within the current window, or the budget error once
    /// `max_restarts` have already happened inside it.
    pub(crate) fn note_restart(&mut self, policy: &RestartPolicy) -> Result<u32, SupervisionError> {
        let now = Instant::now();
        if now.duration_since(self.window_start) > policy.window {
            self.count = 0;
            self.window_start = now;
        }
        if self.count >= policy.max_restarts {
            return Err(SupervisionError::RestartLimitExceeded {
                max: policy.max_restarts,
                window: policy.window,
            });
        }
        self.count += 1;
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategy_is_restart() {
        assert_eq!(SupervisorStrategy::default(), SupervisorStrategy::Restart);
    }

    #[test]
    fn test_default_policy() {
        let policy = RestartPolicy::default();
        assert_eq!(policy.max_restarts, 3);
        assert_eq!(policy.window, Duration::from_millis(60_000));
    }

    #[test]
    fn test_budget_exhaustion() {
        let policy = RestartPolicy {
            max_restarts: 3,
            window: Duration::from_secs(60),
        };
        let mut window = RestartWindow::new();
        assert_eq!(window.note_restart(&policy), Ok(1));
        assert_eq!(window.note_restart(&policy), Ok(2));
        assert_eq!(window.note_restart(&policy), Ok(3));
        assert!(matches!(
            window.note_restart(&policy),
            Err(SupervisionError::RestartLimitExceeded { max: 3, .. })
        ));
    }

    #[test]
    fn test_window_expiry_resets_budget() {
        let policy = RestartPolicy {
            max_restarts: 1,
            window: Duration::from_millis(10),
        };
        let mut window = RestartWindow::new();
        assert_eq!(window.note_restart(&policy), Ok(1));
        assert!(window.note_restart(&policy).is_err());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(window.note_restart(&policy), Ok(1));
    }

}
