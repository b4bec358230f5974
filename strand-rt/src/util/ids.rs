// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Unique identifier for actors in the system.
///
/// Actor ids are process-unique 64-bit integers drawn from a monotonic
/// counter owned by the [`ActorSystem`](crate::system::ActorSystem) that
/// spawned the actor. Ids are generated at spawn and never reused, so an
/// id observed in a `Terminated` notification can never later refer to a
/// different actor.
///
/// # Example
/// ```rust
/// use strand_rt::util::ActorId;
///
/// let id1 = ActorId::from_raw(1);
/// let id2 = ActorId::from_raw(2);
/// assert_ne!(id1, id2);
/// assert!(id1 < id2); // spawn order is observable
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    /// Build an id from a raw counter value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying counter value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for messages.
///
/// Message ids are 64-bit monotonic values; they order message creation
/// within a process but carry no ordering meaning across processes.
///
/// # Example
/// ```rust
/// use strand_rt::util::MessageId;
///
/// let id = MessageId::next();
/// assert!(id.as_u64() > 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// Allocate the next process-unique message id.
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        // Relaxed: the counter only needs uniqueness and monotonicity of the
        // fetched values, not ordering against any other memory.
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Build an id from a raw counter value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying counter value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}
