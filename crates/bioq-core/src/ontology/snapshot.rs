use super::models::{
    NodeId, OntologyNode, OntologySource, SnapshotDocument, SnapshotStats, SnapshotVersion,
    TermHit, TermKind,
};
use crate::error::OntologyError;
use bioq_common::checksum::digest_json;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, info};

/// A loaded, indexed, read-only ontology snapshot
///
/// Nodes live in an arena and reference each other by [`NodeId`], so cyclic
/// relations (a protein xref pointing back at its gene) are plain integers.
/// Traversals keep a visited set and terminate on cycles.
#[derive(Debug)]
pub struct OntologySnapshot {
    version: SnapshotVersion,
    nodes: Vec<OntologyNode>,
    by_id: HashMap<String, NodeId>,
    terms: BTreeMap<String, Vec<TermHit>>,
}

/// Lowercase and collapse whitespace, the key form of the term index
pub(crate) fn term_key(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl OntologySnapshot {
    /// Build a snapshot from a parsed document, keeping only `active` sources
    pub fn from_document(
        document: SnapshotDocument,
        active: &[OntologySource],
    ) -> Result<Self, OntologyError> {
        if document.version.trim().is_empty() {
            return Err(OntologyError::Invalid("version label is empty".to_string()));
        }

        let canonical = serde_json::to_value(&document)
            .map_err(|e| OntologyError::Parse(e.to_string()))?;
        let version = SnapshotVersion {
            label: document.version.trim().to_string(),
            digest: digest_json(&canonical)?,
        };

        for (id, record) in &document.records {
            let expected = OntologySource::from_id(id)
                .ok_or_else(|| OntologyError::UnknownPrefix { id: id.clone() })?;
            if expected != record.source {
                return Err(OntologyError::SourceMismatch {
                    id: id.clone(),
                    declared: record.source.to_string(),
                    expected: expected.to_string(),
                });
            }
            if record.label.trim().is_empty() {
                return Err(OntologyError::Invalid(format!("record '{}' has an empty label", id)));
            }
        }

        // Node ids follow the document's sorted key order, so two loads of the
        // same document produce identical arenas.
        let mut by_id = HashMap::new();
        let mut kept = Vec::new();
        for (id, record) in &document.records {
            if !active.contains(&record.source) {
                continue;
            }
            let node_id = u32::try_from(kept.len())
                .map(NodeId)
                .map_err(|_| OntologyError::Invalid("too many records".to_string()))?;
            by_id.insert(id.clone(), node_id);
            kept.push((id, record));
        }

        if kept.is_empty() {
            return Err(OntologyError::EmptySnapshot);
        }

        let resolve_edge = |from: &str, to: &str, relation: &'static str| {
            if let Some(node) = by_id.get(to) {
                Ok(Some(*node))
            } else if document.records.contains_key(to) {
                // Target exists but its source is inactive
                Ok(None)
            } else {
                Err(OntologyError::DanglingEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                    relation,
                })
            }
        };

        let mut nodes = Vec::with_capacity(kept.len());
        for (id, record) in &kept {
            let mut parents = Vec::new();
            for parent in &record.parents {
                if let Some(node) = resolve_edge(id, parent, "parent")? {
                    parents.push(node);
                }
            }

            let mut children = Vec::new();
            for child in &record.children {
                if let Some(node) = resolve_edge(id, child, "child")? {
                    children.push(node);
                }
            }

            let mut xrefs = Vec::new();
            let mut external_xrefs = Vec::new();
            for xref in &record.xrefs {
                match by_id.get(xref) {
                    Some(node) => xrefs.push(*node),
                    None => external_xrefs.push(xref.clone()),
                }
            }

            nodes.push(OntologyNode {
                id: (*id).clone(),
                source: record.source,
                label: record.label.trim().to_string(),
                synonyms: record.synonyms.iter().map(|s| s.trim().to_string()).collect(),
                parents,
                children,
                xrefs,
                external_xrefs,
                attributes: record.attributes.clone(),
            });
        }

        // Hierarchy edges are symmetric: declared children plus reverse parents
        let mut reverse: Vec<(usize, NodeId, bool)> = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            let this = NodeId(index as u32);
            for parent in &node.parents {
                reverse.push((parent.index(), this, true));
            }
            for child in &node.children {
                reverse.push((child.index(), this, false));
            }
        }
        for (target, other, is_child) in reverse {
            if is_child {
                nodes[target].children.push(other);
            } else {
                nodes[target].parents.push(other);
            }
        }

        let mut terms: BTreeMap<String, Vec<TermHit>> = BTreeMap::new();
        for (index, node) in nodes.iter_mut().enumerate() {
            for list in [&mut node.parents, &mut node.children, &mut node.xrefs] {
                list.sort();
                list.dedup();
            }
            node.external_xrefs.sort();
            node.external_xrefs.dedup();

            let this = NodeId(index as u32);
            terms.entry(term_key(&node.label)).or_default().push(TermHit {
                node: this,
                kind: TermKind::Label,
                surface: node.label.clone(),
            });
            for synonym in node.synonyms.iter().filter(|s| !s.is_empty()) {
                terms.entry(term_key(synonym)).or_default().push(TermHit {
                    node: this,
                    kind: TermKind::Synonym,
                    surface: synonym.clone(),
                });
            }
        }
        for hits in terms.values_mut() {
            hits.sort();
            hits.dedup();
        }

        let snapshot = Self {
            version,
            nodes,
            by_id,
            terms,
        };

        info!(
            version = %snapshot.version,
            records = snapshot.nodes.len(),
            terms = snapshot.terms.len(),
            "ontology snapshot loaded"
        );

        Ok(snapshot)
    }

    pub fn version(&self) -> &SnapshotVersion {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&OntologyNode> {
        self.nodes.get(node.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &OntologyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    pub fn lookup_id(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn by_id(&self, id: &str) -> Option<&OntologyNode> {
        self.lookup_id(id).and_then(|node| self.get(node))
    }

    /// Index entries for a term; matching is case-insensitive
    pub fn term_hits(&self, term: &str) -> &[TermHit] {
        self.terms
            .get(&term_key(term))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All indexed terms in sorted order, for fuzzy scans
    pub fn terms(&self) -> impl Iterator<Item = (&str, &[TermHit])> {
        self.terms.iter().map(|(term, hits)| (term.as_str(), hits.as_slice()))
    }

    pub fn is_active(&self, source: OntologySource) -> bool {
        self.nodes.iter().any(|node| node.source == source)
    }

    fn walk(&self, start: NodeId, next: impl Fn(&OntologyNode) -> &[NodeId]) -> Vec<NodeId> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        if let Some(node) = self.get(start) {
            queue.extend(next(node).iter().copied());
        }

        while let Some(current) = queue.pop_front() {
            if current == start || !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.get(current) {
                queue.extend(next(node).iter().copied());
            }
        }

        visited.into_iter().collect()
    }

    /// Transitive parents, sorted by node id
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        self.walk(node, |n| &n.parents)
    }

    /// Transitive children, sorted by node id
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.walk(node, |n| &n.children)
    }

    pub fn is_a(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        descendant == ancestor || self.ancestors(descendant).contains(&ancestor)
    }

    /// Direct cross-references of `node` that belong to `source`
    pub fn xref_targets(&self, node: NodeId, source: OntologySource) -> Vec<NodeId> {
        self.get(node)
            .map(|n| {
                n.xrefs
                    .iter()
                    .copied()
                    .filter(|x| self.get(*x).map(|t| t.source == source).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Taxon a record belongs to: itself for species, else its first taxon xref
    pub fn taxon_of(&self, node: NodeId) -> Option<NodeId> {
        let record = self.get(node)?;
        if record.source == OntologySource::NcbiTaxonomy {
            return Some(node);
        }
        self.xref_targets(node, OntologySource::NcbiTaxonomy)
            .into_iter()
            .next()
    }

    pub fn stats(&self) -> SnapshotStats {
        let mut stats = SnapshotStats {
            records: self.nodes.len(),
            terms: self.terms.len(),
            ..SnapshotStats::default()
        };
        for node in &self.nodes {
            *stats.records_per_source.entry(node.source).or_default() += 1;
            stats.hierarchy_edges += node.parents.len();
            stats.xref_edges += node.xrefs.len();
            stats.external_xrefs += node.external_xrefs.len();
        }
        debug!(records = stats.records, "computed snapshot stats");
        stats
    }
}
