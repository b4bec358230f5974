//! Lazy path-based actor selection.

// Layer 1: Standard library
use std::sync::{Arc, Weak};

// Layer 2: Third-party
// (none)

// Layer 3: Internal
use super::actor_system::SystemShared;
use crate::actor::cell::ref_for;
use crate::actor::ActorRef;

/// A selection over registry paths, resolved lazily at call time.
///
/// Supported patterns:
/// - an exact path: `/user/worker-1`
/// - a trailing single-level wildcard: `/user/workers/*` (direct children)
///
/// # Example
/// ```rust,no_run
/// # use strand_rt::system::{ActorSystem, SystemConfig};
/// # let system = ActorSystem::new("demo", SystemConfig::default()).unwrap();
/// let everyone = system.selection("/user/*");
/// for actor in everyone.resolve() {
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct ActorSelection {
    shared: Weak<SystemShared>,
    pattern: String,
}

impl ActorSelection {
    pub(crate) fn new(shared: &Arc<SystemShared>, pattern: &str) -> Self {
        Self {
            shared: Arc::downgrade(shared),
            pattern: pattern.to_string(),
        }
    }

    /// The pattern this selection resolves.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Resolve against the current registry contents.
    pub fn resolve(&self) -> Vec<ActorRef> {
        let Some(shared) = self.shared.upgrade() else {
            return Vec::new();
        };
        match self.pattern.strip_suffix("/*") {
            Some(parent) => {
                let parent = if parent.is_empty() { "/" } else { parent };
                shared
                    .registry
                    .children_of(parent)
                    .iter()
                    .map(ref_for)
                    .collect()
            }
            None => shared
                .registry
                .by_path(&self.pattern)
                .map(|cell| vec![ref_for(&cell)])
                .unwrap_or_default(),
        }
    }

    /// The first match, if any.
    pub fn first(&self) -> Option<ActorRef> {
        self.resolve().into_iter().next()
    }

    /// Whether anything currently matches.
    pub fn is_empty(&self) -> bool {
        self.resolve().is_empty()
    }
}

impl std::fmt::Debug for ActorSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSelection")
            .field("pattern", &self.pattern)
            .finish()
    }
}
