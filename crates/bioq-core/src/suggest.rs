//! Follow-up questions for a resolved frame
//!
//! Suggestions come from the frame's gene (the other things one can ask
//! about it) and from the ontology hierarchy above any GO term or disease
//! the question mentioned. The output depends only on the frame and the
//! snapshot, so the same question always yields the same list.

use crate::model::{
    AnnotationScope, CanonicalEntity, EntityKind, IntentKind, SemanticFrame, SlotName,
};
use crate::ontology::{NodeId, OntologySnapshot, OntologySource};

pub const MAX_SUGGESTIONS: usize = 5;

/// Kinds of gene question a follow-up can ask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneQuestion {
    Function,
    Interactions,
    Pathways,
    Homologs,
}

impl GeneQuestion {
    const ALL: [GeneQuestion; 4] = [
        GeneQuestion::Function,
        GeneQuestion::Interactions,
        GeneQuestion::Pathways,
        GeneQuestion::Homologs,
    ];

    /// The question the frame itself already asks, if it is one of these
    fn asked_by(frame: &SemanticFrame) -> Option<Self> {
        match frame.intent {
            IntentKind::Annotation => {
                let scope = frame
                    .slot(SlotName::Scope)
                    .and_then(|fill| fill.value.literal())
                    .and_then(AnnotationScope::parse)
                    .unwrap_or_default();
                Some(match scope {
                    AnnotationScope::Function => GeneQuestion::Function,
                    AnnotationScope::Pathways => GeneQuestion::Pathways,
                })
            },
            IntentKind::Interaction => Some(GeneQuestion::Interactions),
            IntentKind::Homology => Some(GeneQuestion::Homologs),
            IntentKind::Lookup | IntentKind::Comparison | IntentKind::Unsupported => None,
        }
    }
}

pub fn suggest(frame: &SemanticFrame, snapshot: &OntologySnapshot) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    let mut push = |question: String| {
        if !suggestions.contains(&question) {
            suggestions.push(question);
        }
    };

    if let Some(gene) = first_gene(frame) {
        let symbol = snapshot
            .get(gene.node)
            .and_then(|node| node.attribute("symbol"))
            .unwrap_or(&gene.display_name);
        let asked = GeneQuestion::asked_by(frame);

        for question in GeneQuestion::ALL.into_iter().filter(|q| Some(*q) != asked) {
            match question {
                GeneQuestion::Function => push(format!("What is the function of {symbol}?")),
                GeneQuestion::Interactions => {
                    push(format!("What proteins interact with {symbol}?"))
                },
                GeneQuestion::Pathways => push(format!("Which pathways involve {symbol}?")),
                GeneQuestion::Homologs => {
                    if let Some(species) = other_species(snapshot, gene.node) {
                        push(format!("Find {species} homologs of {symbol}"));
                    }
                },
            }
        }
    }

    for entity in frame.entities.iter().filter(|e| {
        matches!(e.kind, EntityKind::GoTerm | EntityKind::Disease)
    }) {
        for label in broader_terms(snapshot, entity.node) {
            push(format!("What is {label}?"));
        }
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Gene the frame is about, slot entities before other mentions
fn first_gene(frame: &SemanticFrame) -> Option<&CanonicalEntity> {
    let is_gene = |e: &&CanonicalEntity| e.kind == EntityKind::Gene;
    [SlotName::Gene, SlotName::Subject]
        .into_iter()
        .filter_map(|slot| frame.slot_entity(slot))
        .find(is_gene)
        .or_else(|| frame.entities.iter().find(is_gene))
}

/// Common name of the lowest-id species other than the gene's own
fn other_species(snapshot: &OntologySnapshot, gene: NodeId) -> Option<String> {
    let own = snapshot.taxon_of(gene);
    let mut species: Vec<_> = snapshot
        .nodes()
        .filter(|(id, node)| node.source == OntologySource::NcbiTaxonomy && Some(*id) != own)
        .map(|(_, node)| node)
        .collect();
    species.sort_by(|a, b| a.id.cmp(&b.id));
    species
        .first()
        .map(|node| node.synonyms.first().unwrap_or(&node.label).clone())
}

/// Labels of non-root ancestors, nearest first
fn broader_terms(snapshot: &OntologySnapshot, node: NodeId) -> Vec<String> {
    let mut ancestors: Vec<(usize, &str, &str)> = snapshot
        .ancestors(node)
        .into_iter()
        .filter_map(|ancestor| snapshot.get(ancestor))
        .filter(|record| !record.parents.is_empty())
        .map(|record| {
            let depth = record
                .parents
                .first()
                .map(|p| snapshot.ancestors(*p).len() + 1)
                .unwrap_or(0);
            (depth, record.id.as_str(), record.label.as_str())
        })
        .collect();
    ancestors.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    ancestors
        .into_iter()
        .map(|(_, _, label)| label.to_string())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::extract::{Extractor, KeywordIntentClassifier, LexiconRecognizer, PatternRecognizer};
    use crate::ontology::{parse_snapshot, SnapshotFormat};
    use crate::resolve::{ResolutionContext, SemanticResolver};
    use std::sync::Arc;

    const SNAPSHOT: &str = r#"{
        "version": "suggest-test",
        "records": {
            "NCBITaxon:9606": {"source": "ncbi_taxonomy", "label": "Homo sapiens", "synonyms": ["human"]},
            "NCBITaxon:10090": {"source": "ncbi_taxonomy", "label": "Mus musculus", "synonyms": ["mouse", "mice"]},
            "NCBIGene:7157": {"source": "ncbi_gene", "label": "TP53", "xrefs": ["NCBITaxon:9606"]},
            "GO:0008150": {"source": "go", "label": "biological_process"},
            "GO:0006915": {"source": "go", "label": "apoptotic process", "parents": ["GO:0008150"]},
            "GO:0097190": {"source": "go", "label": "apoptotic signaling pathway", "parents": ["GO:0006915"]},
            "GO:0097193": {"source": "go", "label": "intrinsic apoptotic signaling pathway", "parents": ["GO:0097190"]}
        }
    }"#;

    fn suggestions_for(text: &str) -> Vec<String> {
        let snapshot = Arc::new(
            parse_snapshot(SNAPSHOT, SnapshotFormat::Json, &OntologySource::ALL).unwrap(),
        );
        let extraction = Extractor::new(
            vec![
                Arc::new(LexiconRecognizer::new(Arc::clone(&snapshot))),
                Arc::new(PatternRecognizer::new()),
            ],
            Arc::new(KeywordIntentClassifier::new()),
        )
        .extract(text)
        .unwrap();
        let config = EngineConfig::default();
        let frame = SemanticResolver::new(&snapshot, &config)
            .resolve(&extraction, &ResolutionContext::default())
            .unwrap();
        suggest(&frame, &snapshot)
    }

    #[test]
    fn test_homology_question_suggests_other_gene_questions() {
        assert_eq!(
            suggestions_for("find mouse homologs of TP53"),
            vec![
                "What is the function of TP53?",
                "What proteins interact with TP53?",
                "Which pathways involve TP53?",
            ]
        );
    }

    #[test]
    fn test_go_term_adds_broader_terms_nearest_first() {
        let suggestions =
            suggestions_for("is TP53 involved in intrinsic apoptotic signaling pathway");
        assert_eq!(
            suggestions,
            vec![
                "What proteins interact with TP53?",
                "Which pathways involve TP53?",
                "Find mouse homologs of TP53",
                "What is apoptotic signaling pathway?",
                "What is apoptotic process?",
            ]
        );
    }

    #[test]
    fn test_pathway_question_suggests_function_instead() {
        let suggestions = suggestions_for("which pathways involve TP53");
        assert!(suggestions.contains(&"What is the function of TP53?".to_string()));
        assert!(!suggestions.contains(&"Which pathways involve TP53?".to_string()));
    }

    #[test]
    fn test_suggestions_are_capped() {
        let suggestions = suggestions_for("what is TP53 in intrinsic apoptotic signaling pathway");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
    }
}
