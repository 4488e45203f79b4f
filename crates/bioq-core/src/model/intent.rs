use super::entity::{CanonicalEntity, EntityKind};
use serde::{Deserialize, Serialize};

/// Query type; declaration order breaks confidence ties in intent rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Lookup,
    Homology,
    Interaction,
    Comparison,
    Annotation,
    Unsupported,
}

impl IntentKind {
    pub const ALL: [IntentKind; 6] = [
        IntentKind::Lookup,
        IntentKind::Homology,
        IntentKind::Interaction,
        IntentKind::Comparison,
        IntentKind::Annotation,
        IntentKind::Unsupported,
    ];

    /// Every slot this intent can carry
    pub fn slots(self) -> &'static [SlotName] {
        match self {
            IntentKind::Lookup => &[SlotName::Subject, SlotName::Species],
            IntentKind::Homology => &[
                SlotName::Gene,
                SlotName::SourceSpecies,
                SlotName::TargetSpecies,
                SlotName::HomologyType,
            ],
            IntentKind::Interaction => &[SlotName::Gene, SlotName::Partner, SlotName::Species],
            IntentKind::Comparison => &[SlotName::Gene, SlotName::OtherGene, SlotName::Species],
            IntentKind::Annotation => &[
                SlotName::Gene,
                SlotName::GoTerm,
                SlotName::Species,
                SlotName::Scope,
            ],
            IntentKind::Unsupported => &[],
        }
    }

    /// Slots that must be filled before a frame of this intent can compile
    pub fn core_required(self) -> &'static [SlotName] {
        match self {
            IntentKind::Lookup => &[SlotName::Subject],
            IntentKind::Homology => &[
                SlotName::Gene,
                SlotName::SourceSpecies,
                SlotName::TargetSpecies,
            ],
            IntentKind::Interaction => &[SlotName::Gene],
            IntentKind::Comparison => &[SlotName::Gene, SlotName::OtherGene],
            IntentKind::Annotation => &[SlotName::Gene],
            IntentKind::Unsupported => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::Lookup => "lookup",
            IntentKind::Homology => "homology",
            IntentKind::Interaction => "interaction",
            IntentKind::Comparison => "comparison",
            IntentKind::Annotation => "annotation",
            IntentKind::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IntentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown intent '{}'", s))
    }
}

/// One entry of the intent ranking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedIntent {
    pub intent: IntentKind,
    pub confidence: f64,
}

impl RankedIntent {
    pub fn new(intent: IntentKind, confidence: f64) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    Subject,
    Gene,
    OtherGene,
    Partner,
    GoTerm,
    Species,
    SourceSpecies,
    TargetSpecies,
    HomologyType,
    Scope,
}

impl SlotName {
    /// Entity kinds that may fill this slot; empty for literal slots
    pub fn accepts(self) -> &'static [EntityKind] {
        match self {
            SlotName::Subject => &EntityKind::ALL,
            SlotName::Gene | SlotName::OtherGene => &[EntityKind::Gene],
            SlotName::Partner => &[EntityKind::Gene, EntityKind::Protein, EntityKind::Chemical],
            SlotName::GoTerm => &[EntityKind::GoTerm],
            SlotName::Species | SlotName::SourceSpecies | SlotName::TargetSpecies => {
                &[EntityKind::Species]
            },
            SlotName::HomologyType | SlotName::Scope => &[],
        }
    }

    pub fn is_literal(self) -> bool {
        self.accepts().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotName::Subject => "subject",
            SlotName::Gene => "gene",
            SlotName::OtherGene => "other_gene",
            SlotName::Partner => "partner",
            SlotName::GoTerm => "go_term",
            SlotName::Species => "species",
            SlotName::SourceSpecies => "source_species",
            SlotName::TargetSpecies => "target_species",
            SlotName::HomologyType => "homology_type",
            SlotName::Scope => "scope",
        }
    }
}

impl std::fmt::Display for SlotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a slot value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOrigin {
    /// A mention in the question
    Text,
    /// The caller's context hints
    Hint,
    /// Derived through an ontology relation
    Inferred,
    /// The configured default
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SlotValue {
    Entity(Box<CanonicalEntity>),
    Literal(String),
}

impl SlotValue {
    pub fn entity(&self) -> Option<&CanonicalEntity> {
        match self {
            SlotValue::Entity(entity) => Some(entity),
            SlotValue::Literal(_) => None,
        }
    }

    pub fn literal(&self) -> Option<&str> {
        match self {
            SlotValue::Literal(value) => Some(value),
            SlotValue::Entity(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotFill {
    pub value: SlotValue,
    pub origin: SlotOrigin,
}

impl SlotFill {
    pub fn entity(entity: CanonicalEntity, origin: SlotOrigin) -> Self {
        Self {
            value: SlotValue::Entity(Box::new(entity)),
            origin,
        }
    }

    pub fn literal(value: impl Into<String>, origin: SlotOrigin) -> Self {
        Self {
            value: SlotValue::Literal(value.into()),
            origin,
        }
    }
}

/// Kind of homology requested from the homology endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomologyType {
    Orthologues,
    Paralogues,
}

impl HomologyType {
    pub fn as_str(self) -> &'static str {
        match self {
            HomologyType::Orthologues => "orthologues",
            HomologyType::Paralogues => "paralogues",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "orthologues" => Some(HomologyType::Orthologues),
            "paralogues" => Some(HomologyType::Paralogues),
            _ => None,
        }
    }
}

/// What an annotation question asks about a gene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationScope {
    /// GO annotations
    #[default]
    Function,
    /// Curated pathways the gene product takes part in
    Pathways,
}

impl AnnotationScope {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationScope::Function => "function",
            AnnotationScope::Pathways => "pathways",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "function" => Some(AnnotationScope::Function),
            "pathways" => Some(AnnotationScope::Pathways),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_core_required_within_schema() {
        for intent in IntentKind::ALL {
            for slot in intent.core_required() {
                assert!(
                    intent.slots().contains(slot),
                    "{} requires {} outside its schema",
                    intent,
                    slot
                );
            }
        }
    }

    #[test]
    fn test_intent_from_str() {
        assert_eq!("Homology".parse::<IntentKind>().unwrap(), IntentKind::Homology);
        assert!("sequence".parse::<IntentKind>().is_err());
    }

    #[test]
    fn test_literal_slots() {
        assert!(SlotName::HomologyType.is_literal());
        assert!(SlotName::Scope.is_literal());
        assert!(!SlotName::Subject.is_literal());
        assert_eq!(SlotName::Subject.accepts().len(), EntityKind::ALL.len());
    }

    #[test]
    fn test_annotation_scope_round_trips_through_slot_literal() {
        for scope in [AnnotationScope::Function, AnnotationScope::Pathways] {
            assert_eq!(AnnotationScope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(AnnotationScope::parse("expression"), None);
        assert!(IntentKind::Annotation.slots().contains(&SlotName::Scope));
    }
}
