//! Ontology store
//!
//! Ontology records (GO, PRO, ChEBI, NCBI Taxonomy, NCBI Gene, DOID) are
//! loaded from a versioned snapshot document into an arena of nodes with
//! integer edges. A loaded [`OntologySnapshot`] is read-only; the
//! [`OntologyStore`] hands out pinned snapshots and swaps in new ones on
//! reload.

mod loader;
mod models;
mod snapshot;
mod store;

pub use loader::{load_snapshot_file, parse_snapshot, SnapshotFormat};
pub use models::{
    NodeId, OntologyNode, OntologyRecord, OntologySource, SnapshotDocument, SnapshotStats,
    SnapshotVersion, TermHit, TermKind,
};
pub use snapshot::OntologySnapshot;
pub use store::OntologyStore;
