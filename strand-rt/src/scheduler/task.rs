//! Scheduler task representation.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::message::Priority;

/// A unit of work the scheduler can execute.
///
/// The canonical runnable processes one batch of messages for one actor;
/// anything else an embedder submits goes through the same vtable.
pub trait Runnable: Send + Sync {
    /// Execute the work to completion. Runs on a worker thread; must not
    /// block on other tasks.
    fn run(&self);

    /// Short human-readable label for diagnostics.
    fn name(&self) -> &str {
        "task"
    }
}

/// A prioritized, cloneable handle to a [`Runnable`].
#[derive(Clone)]
pub struct Task {
    runnable: Arc<dyn Runnable>,
    priority: Priority,
}

impl Task {
    /// Wrap a runnable at the given priority.
    pub fn new(runnable: Arc<dyn Runnable>, priority: Priority) -> Self {
        Self { runnable, priority }
    }

    /// Execute the task.
    pub fn run(&self) {
        self.runnable.run();
    }

    /// Diagnostic label.
    pub fn name(&self) -> &str {
        self.runnable.name()
    }

    /// The global-queue lane this task dispatches on.
    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name())
            .field("priority", &self.priority)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting {
        hits: AtomicU32,
    }

    impl Runnable for Counting {
        fn run(&self) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_run_and_clone_share_runnable() {
        let runnable = Arc::new(Counting {
            hits: AtomicU32::new(0),
        });
        let task = Task::new(Arc::clone(&runnable) as Arc<dyn Runnable>, Priority::Normal);
        let clone = task.clone();
        task.run();
        clone.run();
        assert_eq!(runnable.hits.load(Ordering::Relaxed), 2);
        assert_eq!(task.name(), "counting");
    }

    #[test]
    fn test_priority_carried() {
        let runnable = Arc::new(Counting {
            hits: AtomicU32::new(0),
        });
        let task = Task::new(runnable, Priority::Critical);
        assert_eq!(task.priority(), Priority::Critical);
    }
}
