//! Concurrent actor registry: path → cell and id → cell.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

// Layer 3: Internal
use super::errors::SystemError;
use crate::actor::cell::ActorCell;
use crate::util::ActorId;

/// Both registry indexes. Lookups are O(1) hash probes; no lock is ever
/// held across user callbacks.
pub(crate) struct Registry {
    by_path: DashMap<String, Arc<ActorCell>>,
    by_id: DashMap<ActorId, Arc<ActorCell>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            by_path: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    /// Insert a freshly built cell. Fails when the path is taken.
    pub(crate) fn insert(&self, cell: &Arc<ActorCell>) -> Result<(), SystemError> {
        match self.by_path.entry(cell.path().as_str().to_owned()) {
            Entry::Occupied(_) => Err(SystemError::ActorAlreadyExists(
                cell.path().as_str().to_owned(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(cell));
                self.by_id.insert(cell.id(), Arc::clone(cell));
                Ok(())
            }
        }
    }

    /// Remove a cell from both indexes. The path entry is only removed
    /// when it still maps to this cell's id (a replacement spawned at the
    /// same path stays registered).
    pub(crate) fn remove(&self, cell: &Arc<ActorCell>) {
        self.by_path
            .remove_if(cell.path().as_str(), |_, current| current.id() == cell.id());
        self.by_id.remove(&cell.id());
    }

    pub(crate) fn by_path(&self, path: &str) -> Option<Arc<ActorCell>> {
        self.by_path.get(path).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn by_id(&self, id: ActorId) -> Option<Arc<ActorCell>> {
        self.by_id.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Cells whose path is a direct child of `parent_path`.
    pub(crate) fn children_of(&self, parent_path: &str) -> Vec<Arc<ActorCell>> {
        let prefix = if parent_path == "/" {
            "/".to_string()
        } else {
            format!("{parent_path}/")
        };
        self.by_path
            .iter()
            .filter(|entry| {
                let path = entry.key();
                path.starts_with(&prefix) && !path[prefix.len()..].contains('/')
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Visit every registered cell.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&Arc<ActorCell>)) {
        for entry in self.by_id.iter() {
            f(entry.value());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}
