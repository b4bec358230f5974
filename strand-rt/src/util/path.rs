//! Hierarchical actor paths.
//!
//! Every actor lives at a slash-separated path rooted at `/`. The runtime
//! reserves two children of the root: `/user` parents all user-spawned
//! actors and `/system` parents runtime-internal ones.

// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// An ordered sequence of name segments uniquely identifying an actor
/// within one system instance.
///
/// Paths are cheap to clone (`Arc<str>` internally) and compare by value.
///
/// # Example
/// ```rust
/// use strand_rt::util::ActorPath;
///
/// let counters = ActorPath::user().child("counters").unwrap();
/// let c1 = counters.child("c1").unwrap();
/// assert_eq!(c1.as_str(), "/user/counters/c1");
/// assert_eq!(c1.name(), "c1");
/// assert_eq!(c1.parent(), Some(counters));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorPath(Arc<str>);

impl ActorPath {
    /// The root guardian path `/`.
    pub fn root() -> Self {
        Self(Arc::from("/"))
    }

    /// The user guardian path `/user`.
    pub fn user() -> Self {
        Self(Arc::from("/user"))
    }

    /// The system guardian path `/system`.
    pub fn system() -> Self {
        Self(Arc::from("/system"))
    }

    /// Parse a path string. Must be absolute and free of empty segments.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "/" {
            return Some(Self::root());
        }
        if !s.starts_with('/') || s.ends_with('/') {
            return None;
        }
        if s[1..].split('/').any(|seg| !Self::valid_segment(seg)) {
            return None;
        }
        Some(Self(Arc::from(s)))
    }

    /// Append a child segment.
    ///
    /// Returns `None` when `name` is empty or contains `/`.
    pub fn child(&self, name: &str) -> Option<Self> {
        if !Self::valid_segment(name) {
            return None;
        }
        let joined = if self.is_root() {
            format!("/{name}")
        } else {
            format!("{}/{}", self.0, name)
        };
        Some(Self(Arc::from(joined.as_str())))
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(Arc::from(&self.0[..idx]))),
            None => None,
        }
    }

    /// The final name segment (the root's name is `/`).
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "/";
        }
        self.0.rfind('/').map(|idx| &self.0[idx + 1..]).unwrap_or(&self.0)
    }

    /// Whether this is the root guardian path.
    pub fn is_root(&self) -> bool {
        &*self.0 == "/"
    }

    /// Whether this path lies inside the `/user` subtree (the guardian
    /// itself excluded).
    pub fn is_user(&self) -> bool {
        self.0.starts_with("/user/")
    }

    /// Whether `self` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &ActorPath) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&*ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// The full path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn valid_segment(seg: &str) -> bool {
        !seg.is_empty() && !seg.contains('/')
    }
}

impl Display for ActorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
