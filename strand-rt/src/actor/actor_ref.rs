//! Lightweight actor handles.

// Layer 1: Standard library imports
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::cell::ActorCell;
use super::stats::ActorStatsSnapshot;
use crate::message::{Message, Payload, SystemTag};
use crate::util::{ActorId, ActorPath};

/// Send-path failures, returned to the caller; the transport never
/// retries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The target mailbox is at capacity; the message was dropped.
    #[error("message delivery failed: mailbox full")]
    MailboxFull,

    /// The target is in a terminal state (or already deallocated).
    #[error("actor {0} is terminated")]
    ActorTerminated(ActorId),

    /// The owning system is past terminating.
    #[error("actor system is shutting down")]
    SystemShutdown,
}

/// A handle for sending messages to one actor.
///
/// Copies share identity: equality and hashing go by [`ActorId`]. The ref
/// holds a *non-owning* pointer into the registry, so holding refs never
/// keeps a stopped actor alive.
#[derive(Clone)]
pub struct ActorRef {
    id: ActorId,
    path: ActorPath,
    cell: Weak<ActorCell>,
}

impl ActorRef {
    pub(crate) fn from_cell(cell: &Arc<ActorCell>) -> Self {
        Self {
            id: cell.id(),
            path: cell.path().clone(),
            cell: Arc::downgrade(cell),
        }
    }

    /// The target's id.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// The target's path.
    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    /// Send a user payload. Never blocks.
    pub fn send(&self, payload: Payload) -> Result<(), SendError> {
        self.send_msg(Message::user(payload))
    }

    /// Send a prebuilt message. System-kind messages go through the
    /// system queue, everything else through the user mailbox.
    pub fn send_msg(&self, msg: Message) -> Result<(), SendError> {
        let Some(cell) = self.cell.upgrade() else {
            return Err(SendError::ActorTerminated(self.id));
        };
        if matches!(msg.kind, crate::message::MessageKind::System(_)) {
            cell.send_system_msg(msg)
        } else {
            cell.send_user(msg)
        }
    }

    /// Send a runtime system message.
    pub fn send_system(&self, tag: SystemTag) -> Result<(), SendError> {
        match self.cell.upgrade() {
            Some(cell) => cell.send_system_msg(Message::system(tag)),
            None => Err(SendError::ActorTerminated(self.id)),
        }
    }

    /// Whether the target has reached a terminal state (or is gone).
    pub fn is_terminated(&self) -> bool {
        match self.cell.upgrade() {
            Some(cell) => cell.state().is_terminal(),
            None => true,
        }
    }

    /// Statistics snapshot, while the actor is still reachable.
    pub fn stats(&self) -> Option<ActorStatsSnapshot> {
        self.cell.upgrade().map(|cell| cell.stats().snapshot())
    }

    /// Wall-clock spawn timestamp, while the actor is still reachable.
    pub fn spawned_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.cell.upgrade().map(|cell| cell.spawned_at())
    }

    /// Messages currently buffered in the target's mailbox (racy
    /// snapshot; `None` once the actor is gone).
    pub fn mailbox_len(&self) -> Option<usize> {
        self.cell.upgrade().map(|cell| cell.mailbox_len())
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<ActorCell>> {
        self.cell.upgrade()
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("path", &self.path.as_str())
            .finish()
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, self.id)
    }
}
