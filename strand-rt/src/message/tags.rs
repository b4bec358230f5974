//! Message type tags and priorities.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::util::ActorId;

/// Message priority, lowest to highest.
///
/// Priorities select the global scheduler lane for an actor's processing
/// task; they do not reorder messages inside a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Background traffic.
    Low,
    /// Default for user messages.
    Normal,
    /// Lifecycle and control traffic.
    High,
    /// Stop/kill class traffic, always dispatched first.
    Critical,
}

impl Priority {
    /// Number of distinct priority levels.
    pub const LEVELS: usize = 4;

    /// Dense index, `Low = 0` through `Critical = 3`.
    pub fn index(self) -> usize {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Critical => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Runtime-internal message tags.
///
/// Each tag carries a fixed priority so the scheduler can dispatch
/// shutdown-class traffic ahead of everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemTag {
    /// First message an actor receives; runs `pre_start`.
    Start,
    /// Graceful stop: drain (per config), `post_stop`, deregister.
    Stop,
    /// Supervised restart of the behavior instance.
    Restart,
    /// Liveness probe; the runtime answers with [`SystemTag::Pong`].
    Ping,
    /// Answer to a [`SystemTag::Ping`], delivered to the behavior.
    Pong,
    /// Periodic liveness signal, delivered to the behavior.
    Heartbeat,
    /// Register the carried actor as a watcher of the receiver.
    Watch(ActorId),
    /// Remove the carried actor from the receiver's watchers.
    Unwatch(ActorId),
    /// The carried actor reached a terminal state.
    Terminated(ActorId),
    /// Immediate stop: no drain, pending messages are dropped.
    Kill,
    /// Self-requested stop (what `ActorContext::stop_self` sends).
    Exit,
    /// The carried descendant failed and escalated; the receiver's
    /// supervision strategy decides its fate.
    Failed(ActorId),
}

impl SystemTag {
    /// The fixed dispatch priority of this tag.
    pub fn priority(self) -> Priority {
        match self {
            SystemTag::Stop | SystemTag::Kill | SystemTag::Exit => Priority::Critical,
            SystemTag::Start
            | SystemTag::Restart
            | SystemTag::Terminated(_)
            | SystemTag::Failed(_) => Priority::High,
            SystemTag::Watch(_) | SystemTag::Unwatch(_) => Priority::Normal,
            SystemTag::Ping | SystemTag::Pong | SystemTag::Heartbeat => Priority::Low,
        }
    }

    /// Whether this tag terminates the receiving actor.
    pub fn is_terminal(self) -> bool {
        matches!(self, SystemTag::Stop | SystemTag::Kill | SystemTag::Exit)
    }
}

/// Top-level message classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Application payload, handled by the behavior's `receive`.
    User,
    /// Runtime lifecycle traffic, handled by the actor cell (some tags are
    /// forwarded to the behavior afterwards).
    System(SystemTag),
    /// Embedder-defined control channel. The runtime carries the tag value
    /// opaquely at high priority and delivers it to `receive`.
    Control(u32),
}

impl MessageKind {
    /// The dispatch priority implied by the kind.
    pub fn priority(self) -> Priority {
        match self {
            MessageKind::User => Priority::Normal,
            MessageKind::System(tag) => tag.priority(),
            MessageKind::Control(_) => Priority::High,
        }
    }

    /// Whether this is runtime-internal traffic.
    pub fn is_system(self) -> bool {
        matches!(self, MessageKind::System(_))
    }
}
