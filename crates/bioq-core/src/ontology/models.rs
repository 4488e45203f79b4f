use bioq_common::ContentDigest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::EntityKind;

/// Ontology a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OntologySource {
    Go,
    Pro,
    Chebi,
    NcbiTaxonomy,
    NcbiGene,
    Doid,
}

impl OntologySource {
    pub const ALL: [OntologySource; 6] = [
        OntologySource::Go,
        OntologySource::Pro,
        OntologySource::Chebi,
        OntologySource::NcbiTaxonomy,
        OntologySource::NcbiGene,
        OntologySource::Doid,
    ];

    /// CURIE prefix including the colon
    pub fn prefix(self) -> &'static str {
        match self {
            OntologySource::Go => "GO:",
            OntologySource::Pro => "PR:",
            OntologySource::Chebi => "CHEBI:",
            OntologySource::NcbiTaxonomy => "NCBITaxon:",
            OntologySource::NcbiGene => "NCBIGene:",
            OntologySource::Doid => "DOID:",
        }
    }

    pub fn entity_kind(self) -> EntityKind {
        match self {
            OntologySource::Go => EntityKind::GoTerm,
            OntologySource::Pro => EntityKind::Protein,
            OntologySource::Chebi => EntityKind::Chemical,
            OntologySource::NcbiTaxonomy => EntityKind::Species,
            OntologySource::NcbiGene => EntityKind::Gene,
            OntologySource::Doid => EntityKind::Disease,
        }
    }

    /// Source owning a CURIE, judged by its prefix
    pub fn from_id(id: &str) -> Option<Self> {
        OntologySource::ALL
            .into_iter()
            .find(|source| id.starts_with(source.prefix()) && id.len() > source.prefix().len())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OntologySource::Go => "go",
            OntologySource::Pro => "pro",
            OntologySource::Chebi => "chebi",
            OntologySource::NcbiTaxonomy => "ncbi_taxonomy",
            OntologySource::NcbiGene => "ncbi_gene",
            OntologySource::Doid => "doid",
        }
    }
}

impl std::fmt::Display for OntologySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OntologySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        OntologySource::ALL
            .into_iter()
            .find(|source| source.as_str() == wanted)
            .ok_or_else(|| format!("unknown ontology source '{}'", s))
    }
}

/// One record of the snapshot document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRecord {
    pub source: OntologySource,
    pub label: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub xrefs: Vec<String>,
    /// Free-form attributes, e.g. `ensembl_name` for species
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// The load format: a version label and a mapping of id to record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: String,
    pub records: BTreeMap<String, OntologyRecord>,
}

/// Index of a node in the snapshot arena
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An ontology record with its edges resolved to arena indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyNode {
    pub id: String,
    pub source: OntologySource,
    pub label: String,
    pub synonyms: Vec<String>,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
    pub xrefs: Vec<NodeId>,
    /// Cross-references to ids outside the snapshot or to inactive sources
    pub external_xrefs: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

impl OntologyNode {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermKind {
    Label,
    Synonym,
}

/// A term-index entry: which node a lowercase term points to and how
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TermHit {
    pub node: NodeId,
    pub kind: TermKind,
    /// The term as written in the record, case preserved
    pub surface: String,
}

/// Snapshot identity: the declared label plus a digest of the document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotVersion {
    pub label: String,
    pub digest: ContentDigest,
}

impl std::fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.label, self.digest.short(12))
    }
}

/// Record and edge counts for inspection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub records: usize,
    pub records_per_source: BTreeMap<OntologySource, usize>,
    pub hierarchy_edges: usize,
    pub xref_edges: usize,
    pub external_xrefs: usize,
    pub terms: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_id() {
        assert_eq!(OntologySource::from_id("GO:0006915"), Some(OntologySource::Go));
        assert_eq!(
            OntologySource::from_id("NCBITaxon:10090"),
            Some(OntologySource::NcbiTaxonomy)
        );
        assert_eq!(OntologySource::from_id("NCBIGene:7157"), Some(OntologySource::NcbiGene));
        assert_eq!(OntologySource::from_id("UniProt:P04637"), None);
        assert_eq!(OntologySource::from_id("GO:"), None);
    }

    #[test]
    fn test_record_defaults() {
        let record: OntologyRecord =
            serde_json::from_str(r#"{"source": "chebi", "label": "aspirin"}"#).unwrap();
        assert_eq!(record.source, OntologySource::Chebi);
        assert!(record.synonyms.is_empty());
        assert!(record.attributes.is_empty());
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!("NCBI_Taxonomy".parse::<OntologySource>().unwrap(), OntologySource::NcbiTaxonomy);
        assert!("uniprot".parse::<OntologySource>().is_err());
    }
}
