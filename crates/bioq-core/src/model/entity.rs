use crate::ontology::{NodeId, OntologySource};
use serde::{Deserialize, Serialize};

/// Biological category of a mention
///
/// The declaration order is the overlap tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Gene,
    Protein,
    Species,
    Disease,
    Chemical,
    #[serde(rename = "go_term")]
    GoTerm,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Gene,
        EntityKind::Protein,
        EntityKind::Species,
        EntityKind::Disease,
        EntityKind::Chemical,
        EntityKind::GoTerm,
    ];

    /// Ontology whose ids are canonical for this kind
    pub fn primary_source(self) -> OntologySource {
        match self {
            EntityKind::Gene => OntologySource::NcbiGene,
            EntityKind::Protein => OntologySource::Pro,
            EntityKind::Species => OntologySource::NcbiTaxonomy,
            EntityKind::Disease => OntologySource::Doid,
            EntityKind::Chemical => OntologySource::Chebi,
            EntityKind::GoTerm => OntologySource::Go,
        }
    }

    /// Sources whose records can be mapped onto the primary source via xrefs
    pub fn secondary_sources(self) -> &'static [OntologySource] {
        match self {
            EntityKind::Gene => &[OntologySource::Pro],
            EntityKind::Protein => &[OntologySource::NcbiGene],
            EntityKind::Species
            | EntityKind::Disease
            | EntityKind::Chemical
            | EntityKind::GoTerm => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Gene => "gene",
            EntityKind::Protein => "protein",
            EntityKind::Species => "species",
            EntityKind::Disease => "disease",
            EntityKind::Chemical => "chemical",
            EntityKind::GoTerm => "go_term",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed mention found in the normalized text
///
/// Offsets are char offsets into the normalized text, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub surface: String,
    pub start: usize,
    pub end: usize,
    pub kind: EntityKind,
    pub confidence: f64,
}

impl EntitySpan {
    pub fn new(
        surface: impl Into<String>,
        start: usize,
        end: usize,
        kind: EntityKind,
        confidence: f64,
    ) -> Self {
        Self {
            surface: surface.into(),
            start,
            end,
            kind,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for EntitySpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' [{}..{}] ({})", self.surface, self.start, self.end, self.kind)
    }
}

/// A candidate that lost (or tied) during resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub ontology_id: String,
    pub confidence: f64,
}

/// A mention resolved to a stable ontology identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEntity {
    pub ontology_id: String,
    pub ontology_source: OntologySource,
    pub kind: EntityKind,
    pub display_name: String,
    pub resolution_confidence: f64,
    pub alternative_candidates: Vec<AlternativeCandidate>,
    /// Several candidates tied and nothing in the context broke the tie
    pub ambiguous: bool,
    /// The mention this entity was resolved from; `None` for entities
    /// supplied by hints, inference or defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention: Option<EntitySpan>,
    #[serde(skip)]
    pub node: NodeId,
}

impl CanonicalEntity {
    /// Local part of the CURIE (`NCBIGene:7157` -> `7157`)
    pub fn local_id(&self) -> &str {
        self.ontology_id
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.ontology_id)
    }
}

/// A mention for which no candidate reached the minimum confidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedSpan {
    pub span: EntitySpan,
    pub best_score: Option<f64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_matches_tie_break() {
        let mut kinds = vec![
            EntityKind::GoTerm,
            EntityKind::Chemical,
            EntityKind::Gene,
            EntityKind::Species,
            EntityKind::Protein,
            EntityKind::Disease,
        ];
        kinds.sort();
        assert_eq!(kinds, EntityKind::ALL.to_vec());
    }

    #[test]
    fn test_span_overlap() {
        let a = EntitySpan::new("tumor protein", 0, 13, EntityKind::Protein, 0.9);
        let b = EntitySpan::new("protein p53", 6, 17, EntityKind::Protein, 0.9);
        let c = EntitySpan::new("p53", 18, 21, EntityKind::Gene, 0.9);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.len(), 13);
    }

    #[test]
    fn test_span_confidence_clamped() {
        assert_eq!(EntitySpan::new("x", 0, 1, EntityKind::Gene, 1.7).confidence, 1.0);
        assert_eq!(EntitySpan::new("x", 0, 1, EntityKind::Gene, -0.2).confidence, 0.0);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(serde_json::to_string(&EntityKind::GoTerm).unwrap(), "\"go_term\"");
        assert_eq!(
            serde_json::from_str::<EntityKind>("\"species\"").unwrap(),
            EntityKind::Species
        );
    }
}
