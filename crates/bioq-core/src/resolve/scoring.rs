//! Candidate generation for a single mention
//!
//! Stages run in order: identifier lookup for CURIEs, exact label/synonym
//! match, fuzzy match (only when nothing matched exactly), then mapping of
//! secondary-source candidates onto the mention kind's primary source.

use crate::config::EngineConfig;
use crate::model::EntitySpan;
use crate::ontology::{NodeId, OntologySnapshot, OntologySource, TermKind};
use std::collections::BTreeMap;
use tracing::trace;

pub(crate) const IDENTIFIER_SCORE: f64 = 1.0;
pub(crate) const EXACT_LABEL_SCORE: f64 = 1.0;
pub(crate) const LABEL_ANY_CASE_SCORE: f64 = 0.90;
pub(crate) const SYNONYM_SCORE: f64 = 0.85;
pub(crate) const FUZZY_WEIGHT: f64 = 0.75;
pub(crate) const CROSS_REFERENCE_WEIGHT: f64 = 0.90;

/// Terms shorter than this never match fuzzily
const MIN_FUZZY_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchStage {
    Identifier,
    ExactLabel,
    LabelAnyCase,
    Synonym,
    Fuzzy,
    CrossReference,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub node: NodeId,
    pub ontology_id: String,
    pub score: f64,
    pub stage: MatchStage,
}

fn keep_best(found: &mut BTreeMap<NodeId, (f64, MatchStage)>, node: NodeId, score: f64, stage: MatchStage) {
    match found.get(&node) {
        Some((existing, _)) if *existing >= score => {},
        _ => {
            found.insert(node, (score, stage));
        },
    }
}

/// Candidates for a mention, best first (ties ordered by ontology id)
pub(crate) fn candidates_for(
    snapshot: &OntologySnapshot,
    span: &EntitySpan,
    config: &EngineConfig,
) -> Vec<Candidate> {
    let primary = span.kind.primary_source();
    let accepted: Vec<OntologySource> = std::iter::once(primary)
        .chain(span.kind.secondary_sources().iter().copied())
        .collect();
    let accepts = |node: NodeId| {
        snapshot
            .get(node)
            .map(|n| accepted.contains(&n.source))
            .unwrap_or(false)
    };

    let mut found: BTreeMap<NodeId, (f64, MatchStage)> = BTreeMap::new();

    if let Some(node) = snapshot.lookup_id(&span.surface) {
        if accepts(node) {
            keep_best(&mut found, node, IDENTIFIER_SCORE, MatchStage::Identifier);
        }
    }

    if found.is_empty() {
        for hit in snapshot.term_hits(&span.surface) {
            if !accepts(hit.node) {
                continue;
            }
            let (score, stage) = match hit.kind {
                TermKind::Label if hit.surface == span.surface => (EXACT_LABEL_SCORE, MatchStage::ExactLabel),
                TermKind::Label => (LABEL_ANY_CASE_SCORE, MatchStage::LabelAnyCase),
                TermKind::Synonym => (SYNONYM_SCORE, MatchStage::Synonym),
            };
            keep_best(&mut found, hit.node, score, stage);
        }
    }

    if found.is_empty() {
        let key = span.surface.to_lowercase();
        if key.chars().count() >= MIN_FUZZY_LEN {
            for (term, hits) in snapshot.terms() {
                let similarity = strsim::jaro_winkler(&key, term);
                if similarity < config.fuzzy_threshold {
                    continue;
                }
                for hit in hits.iter().filter(|h| accepts(h.node)) {
                    keep_best(&mut found, hit.node, FUZZY_WEIGHT * similarity, MatchStage::Fuzzy);
                }
            }
        }
    }

    // Secondary-source candidates only count through their xrefs
    let mut mapped: BTreeMap<NodeId, (f64, MatchStage)> = BTreeMap::new();
    for (node, (score, stage)) in found {
        let source = snapshot.get(node).map(|n| n.source);
        if source == Some(primary) {
            keep_best(&mut mapped, node, score, stage);
            continue;
        }
        for target in snapshot.xref_targets(node, primary) {
            keep_best(&mut mapped, target, score * CROSS_REFERENCE_WEIGHT, MatchStage::CrossReference);
        }
    }

    let mut candidates: Vec<Candidate> = mapped
        .into_iter()
        .filter_map(|(node, (score, stage))| {
            snapshot.get(node).map(|n| Candidate {
                node,
                ontology_id: n.id.clone(),
                score,
                stage,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.ontology_id.cmp(&b.ontology_id))
    });

    trace!(span = %span, candidates = candidates.len(), "generated candidates");
    candidates
}
