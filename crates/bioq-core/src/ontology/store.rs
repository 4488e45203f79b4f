use super::loader::load_snapshot_file;
use super::models::OntologySource;
use super::snapshot::OntologySnapshot;
use crate::error::OntologyError;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Holder of the current ontology snapshot
///
/// Queries pin a snapshot with [`snapshot`](Self::snapshot) and keep it for
/// their whole lifetime. [`reload`](Self::reload) swaps the pointer; pinned
/// readers are unaffected and the old snapshot is freed when the last of
/// them finishes.
#[derive(Debug)]
pub struct OntologyStore {
    current: RwLock<Arc<OntologySnapshot>>,
}

impl OntologyStore {
    pub fn new(snapshot: OntologySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        active: &[OntologySource],
    ) -> Result<Self, OntologyError> {
        Ok(Self::new(load_snapshot_file(path, active)?))
    }

    /// Pin the current snapshot
    pub fn snapshot(&self) -> Arc<OntologySnapshot> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the current snapshot, returning the previous one
    pub fn reload(&self, snapshot: OntologySnapshot) -> Arc<OntologySnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::mem::replace(&mut *guard, next);
        info!(
            previous = %previous.version(),
            current = %guard.version(),
            "ontology snapshot reloaded"
        );
        previous
    }

    pub fn reload_from_file(
        &self,
        path: impl AsRef<Path>,
        active: &[OntologySource],
    ) -> Result<Arc<OntologySnapshot>, OntologyError> {
        let snapshot = load_snapshot_file(path, active)?;
        Ok(self.reload(snapshot))
    }
}
