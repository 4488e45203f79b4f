//! Semantic resolution
//!
//! Maps extracted spans onto canonical ontology ids, then fills the slots of
//! the best intent that can be completed. Resolution is a pure function of
//! the extraction, the pinned snapshot, the configuration and the context:
//! candidates are ordered by score and then id, and ties are never broken
//! arbitrarily.

mod scoring;
mod slots;

use crate::config::{AmbiguityPolicy, EngineConfig};
use crate::error::QueryError;
use crate::extract::Extraction;
use crate::model::{
    AlternativeCandidate, CanonicalEntity, ContextHints, EntityKind, EntitySpan, FrameStatus,
    IntentKind, SemanticFrame, SlotName, UnresolvedSpan,
};
use crate::ontology::{NodeId, OntologySnapshot, OntologySource};
use scoring::{candidates_for, Candidate};
use slots::SlotFiller;
use tracing::{debug, instrument, warn};

/// Float slack when comparing scores against the tie margin
const SCORE_EPSILON: f64 = 1e-9;

/// Taxa that may break ties, gathered from hints and earlier turns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionContext {
    pub hint_species: Option<NodeId>,
    pub prior_taxa: Vec<NodeId>,
}

enum SpanResolution {
    Resolved(CanonicalEntity),
    Unresolved(UnresolvedSpan),
}

pub struct SemanticResolver<'a> {
    snapshot: &'a OntologySnapshot,
    config: &'a EngineConfig,
}

impl<'a> SemanticResolver<'a> {
    pub fn new(snapshot: &'a OntologySnapshot, config: &'a EngineConfig) -> Self {
        Self { snapshot, config }
    }

    /// Find a species record by CURIE, label or synonym
    pub fn lookup_species(&self, name: &str) -> Option<NodeId> {
        let name = name.trim();
        if let Some(node) = self.snapshot.lookup_id(name) {
            return self
                .snapshot
                .get(node)
                .filter(|n| n.source == OntologySource::NcbiTaxonomy)
                .map(|_| node);
        }
        self.snapshot
            .term_hits(name)
            .iter()
            .map(|hit| hit.node)
            .find(|node| {
                self.snapshot
                    .get(*node)
                    .map(|n| n.source == OntologySource::NcbiTaxonomy)
                    .unwrap_or(false)
            })
    }

    /// Build the tie-break context from hints and an optional extraction of
    /// the previous turn
    pub fn context_from_hints(
        &self,
        hints: &ContextHints,
        prior: Option<&Extraction>,
    ) -> ResolutionContext {
        let hint_species = hints.species.as_deref().and_then(|species| {
            let found = self.lookup_species(species);
            if found.is_none() {
                warn!(species, "species hint does not match any taxon; ignoring");
            }
            found
        });

        let mut prior_taxa: Vec<NodeId> = prior
            .map(|extraction| {
                extraction
                    .spans
                    .iter()
                    .filter(|span| span.kind == EntityKind::Species)
                    .filter_map(|span| {
                        candidates_for(self.snapshot, span, self.config)
                            .into_iter()
                            .find(|c| c.score >= self.config.min_match_confidence)
                            .map(|c| c.node)
                    })
                    .collect()
            })
            .unwrap_or_default();
        prior_taxa.sort();
        prior_taxa.dedup();

        ResolutionContext {
            hint_species,
            prior_taxa,
        }
    }

    /// Resolve an extraction into a semantic frame
    ///
    /// Returns an `incomplete` frame when no eligible intent can be filled.
    /// When an unresolved mention could have filled a slot the top intent is
    /// missing, that mention is reported as `UnresolvedEntity` before any
    /// lower-ranked intent is tried.
    #[instrument(skip_all, fields(draft = %extraction.draft_intent()))]
    pub fn resolve(
        &self,
        extraction: &Extraction,
        context: &ResolutionContext,
    ) -> Result<SemanticFrame, QueryError> {
        let draft = extraction.draft_intent();

        // Species first: they feed the context for everything else
        let mut resolutions: Vec<(usize, SpanResolution)> = Vec::new();
        let mut text_taxa = Vec::new();
        for (index, span) in extraction.spans.iter().enumerate() {
            if span.kind != EntityKind::Species {
                continue;
            }
            let resolution = self.resolve_span(span, &[])?;
            if let SpanResolution::Resolved(entity) = &resolution {
                text_taxa.push(entity.node);
            }
            resolutions.push((index, resolution));
        }

        let mut context_taxa: Vec<NodeId> = context
            .hint_species
            .into_iter()
            .chain(context.prior_taxa.iter().copied())
            .collect();
        if draft != IntentKind::Homology {
            context_taxa.extend(text_taxa);
        }
        context_taxa.sort();
        context_taxa.dedup();

        for (index, span) in extraction.spans.iter().enumerate() {
            if span.kind == EntityKind::Species {
                continue;
            }
            resolutions.push((index, self.resolve_span(span, &context_taxa)?));
        }
        resolutions.sort_by_key(|(index, _)| *index);

        let mut entities: Vec<CanonicalEntity> = Vec::new();
        let mut unresolved = Vec::new();
        for (_, resolution) in resolutions {
            match resolution {
                SpanResolution::Resolved(entity) => {
                    if !entities.iter().any(|e| e.ontology_id == entity.ontology_id) {
                        entities.push(entity);
                    }
                },
                SpanResolution::Unresolved(span) => unresolved.push(span),
            }
        }

        let hint_entity = context
            .hint_species
            .and_then(|node| self.entity_from_node(node, 1.0));
        let filler = SlotFiller::new(
            self.snapshot,
            self.config,
            &extraction.text,
            &entities,
            hint_entity.as_ref(),
        );

        let top = draft;
        let eligible: Vec<IntentKind> = extraction
            .intents
            .iter()
            .enumerate()
            .filter(|(position, ranked)| *position == 0 || ranked.intent != IntentKind::Unsupported)
            .map(|(_, ranked)| ranked.intent)
            .collect();

        let mut attempted = Vec::new();
        let mut top_attempt = None;
        for intent in eligible {
            attempted.push(intent);
            let (slots, missing) = filler.fill(intent);
            if missing.is_empty() {
                debug!(intent = %intent, slots = slots.len(), "frame complete");
                return Ok(SemanticFrame {
                    intent,
                    slots,
                    status: FrameStatus::Complete,
                    text: extraction.text.text.clone(),
                    spans: extraction.spans.clone(),
                    ranked_intents: extraction.intents.clone(),
                    attempted_intents: attempted,
                    entities,
                    unresolved,
                    snapshot_version: self.snapshot.version().clone(),
                });
            }
            debug!(intent = %intent, missing = ?missing, "intent could not be completed");
            if top_attempt.is_none() {
                // A weaker intent must not answer in place of the one the
                // question asked for when only an unmatched mention blocks it
                if let Some(blocking) = blocking_span(&unresolved, &missing) {
                    return Err(QueryError::UnresolvedEntity {
                        span: blocking.span.clone(),
                        best_score: blocking.best_score,
                    });
                }
                top_attempt = Some((intent, slots, missing));
            }
        }

        let (intent, slots, missing) =
            top_attempt.unwrap_or_else(|| (top, Default::default(), top.core_required().to_vec()));

        if let Some(blocking) = blocking_span(&unresolved, &missing) {
            return Err(QueryError::UnresolvedEntity {
                span: blocking.span.clone(),
                best_score: blocking.best_score,
            });
        }

        Ok(SemanticFrame {
            intent,
            slots,
            status: FrameStatus::Incomplete { missing },
            text: extraction.text.text.clone(),
            spans: extraction.spans.clone(),
            ranked_intents: extraction.intents.clone(),
            attempted_intents: attempted,
            entities,
            unresolved,
            snapshot_version: self.snapshot.version().clone(),
        })
    }

    fn resolve_span(
        &self,
        span: &EntitySpan,
        context_taxa: &[NodeId],
    ) -> Result<SpanResolution, QueryError> {
        let all = candidates_for(self.snapshot, span, self.config);
        let best_score = all.first().map(|c| c.score);
        let candidates: Vec<Candidate> = all
            .into_iter()
            .filter(|c| c.score + SCORE_EPSILON >= self.config.min_match_confidence)
            .collect();

        let Some(top) = candidates.first() else {
            debug!(span = %span, ?best_score, "no candidate above minimum confidence");
            return Ok(SpanResolution::Unresolved(UnresolvedSpan {
                span: span.clone(),
                best_score,
            }));
        };

        let top_score = top.score;
        let tied: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| top_score - c.score <= self.config.tie_margin + SCORE_EPSILON)
            .collect();

        let tied = if tied.len() > 1 && !context_taxa.is_empty() {
            let in_context: Vec<&Candidate> = tied
                .iter()
                .copied()
                .filter(|c| {
                    self.snapshot
                        .taxon_of(c.node)
                        .map(|taxon| context_taxa.contains(&taxon))
                        .unwrap_or(false)
                })
                .collect();
            if in_context.is_empty() {
                tied
            } else {
                in_context
            }
        } else {
            tied
        };

        let alternatives_of = |chosen: &[&Candidate], include_chosen: bool| {
            let mut ordered: Vec<&Candidate> = Vec::new();
            if include_chosen {
                ordered.extend(chosen.iter().copied());
            }
            ordered.extend(candidates.iter().filter(|c| !chosen.iter().any(|t| t.node == c.node)));
            ordered
                .into_iter()
                .take(self.config.max_alternatives)
                .map(|c| AlternativeCandidate {
                    ontology_id: c.ontology_id.clone(),
                    confidence: c.score,
                })
                .collect::<Vec<_>>()
        };

        if tied.len() == 1 {
            let chosen = tied[0];
            let mut entity = self.entity_for(span, chosen.node, chosen.score)?;
            entity.alternative_candidates = alternatives_of(&tied[..], false);
            return Ok(SpanResolution::Resolved(entity));
        }

        let alternatives = alternatives_of(&tied[..], true);
        if self.config.ambiguity_policy == AmbiguityPolicy::Reject {
            return Err(QueryError::AmbiguousResolution {
                span: span.clone(),
                candidates: alternatives,
            });
        }

        let default_taxon = self.snapshot.lookup_id(&self.config.default_species);
        let primary = tied
            .iter()
            .copied()
            .find(|c| default_taxon.is_some() && self.snapshot.taxon_of(c.node) == default_taxon)
            .or_else(|| tied.iter().copied().min_by(|a, b| a.ontology_id.cmp(&b.ontology_id)))
            .unwrap_or(top);

        let confidence = top_score / tied.len() as f64;
        let mut entity = self.entity_for(span, primary.node, confidence)?;
        entity.alternative_candidates = alternatives;
        entity.ambiguous = true;

        warn!(
            span = %span,
            chosen = %entity.ontology_id,
            tied = tied.len(),
            "ambiguous mention; reporting all tied candidates"
        );
        Ok(SpanResolution::Resolved(entity))
    }

    fn entity_for(
        &self,
        span: &EntitySpan,
        node: NodeId,
        confidence: f64,
    ) -> Result<CanonicalEntity, QueryError> {
        let mut entity = self.entity_from_node(node, confidence).ok_or_else(|| {
            QueryError::UnresolvedEntity {
                span: span.clone(),
                best_score: Some(confidence),
            }
        })?;
        entity.mention = Some(span.clone());
        Ok(entity)
    }

    pub(crate) fn entity_from_node(&self, node: NodeId, confidence: f64) -> Option<CanonicalEntity> {
        entity_from_node(self.snapshot, node, confidence)
    }
}

/// First unresolved mention whose kind one of the missing slots accepts
fn blocking_span<'u>(
    unresolved: &'u [UnresolvedSpan],
    missing: &[SlotName],
) -> Option<&'u UnresolvedSpan> {
    unresolved
        .iter()
        .find(|u| missing.iter().any(|slot| slot.accepts().contains(&u.span.kind)))
}

/// Canonical entity for a snapshot node, without a text mention
pub(crate) fn entity_from_node(
    snapshot: &OntologySnapshot,
    node: NodeId,
    confidence: f64,
) -> Option<CanonicalEntity> {
    let record = snapshot.get(node)?;
    Some(CanonicalEntity {
        ontology_id: record.id.clone(),
        ontology_source: record.source,
        kind: record.source.entity_kind(),
        display_name: record.label.clone(),
        resolution_confidence: confidence,
        alternative_candidates: Vec::new(),
        ambiguous: false,
        mention: None,
        node,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extract::{Extractor, KeywordIntentClassifier, LexiconRecognizer, PatternRecognizer};
    use crate::model::SlotOrigin;
    use crate::ontology::{parse_snapshot, SnapshotFormat};
    use std::sync::Arc;

    const SNAPSHOT: &str = r#"{
        "version": "resolver-test",
        "records": {
            "NCBITaxon:9606": {"source": "ncbi_taxonomy", "label": "Homo sapiens", "synonyms": ["human"], "attributes": {"ensembl_name": "homo_sapiens"}},
            "NCBITaxon:10090": {"source": "ncbi_taxonomy", "label": "Mus musculus", "synonyms": ["mouse", "mice"], "attributes": {"ensembl_name": "mus_musculus"}},
            "NCBIGene:7157": {"source": "ncbi_gene", "label": "TP53", "synonyms": ["p53"], "xrefs": ["NCBITaxon:9606", "PR:000003035"]},
            "NCBIGene:22059": {"source": "ncbi_gene", "label": "Trp53", "synonyms": ["p53", "Tp53"], "xrefs": ["NCBITaxon:10090"]},
            "PR:000003035": {"source": "pro", "label": "cellular tumor antigen p53", "xrefs": ["NCBIGene:7157"]}
        }
    }"#;

    fn snapshot() -> Arc<OntologySnapshot> {
        Arc::new(parse_snapshot(SNAPSHOT, SnapshotFormat::Json, &OntologySource::ALL).unwrap())
    }

    fn extract(snapshot: &Arc<OntologySnapshot>, text: &str) -> Extraction {
        Extractor::new(
            vec![
                Arc::new(LexiconRecognizer::new(Arc::clone(snapshot))),
                Arc::new(PatternRecognizer::new()),
            ],
            Arc::new(KeywordIntentClassifier::new()),
        )
        .extract(text)
        .unwrap()
    }

    #[test]
    fn test_ambiguous_symbol_reports_both_candidates() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let resolver = SemanticResolver::new(&snapshot, &config);
        let frame = resolver
            .resolve(&extract(&snapshot, "what does p53 do"), &ResolutionContext::default())
            .unwrap();

        let gene = frame.slot_entity(SlotName::Gene).unwrap();
        assert!(gene.ambiguous);
        assert_eq!(gene.ontology_id, "NCBIGene:7157");
        assert!((gene.resolution_confidence - 0.425).abs() < 1e-9);
        let ids: Vec<&str> = gene
            .alternative_candidates
            .iter()
            .map(|c| c.ontology_id.as_str())
            .collect();
        assert_eq!(ids, vec!["NCBIGene:22059", "NCBIGene:7157"]);
    }

    #[test]
    fn test_species_hint_breaks_tie() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let resolver = SemanticResolver::new(&snapshot, &config);
        let hints = ContextHints {
            species: Some("mouse".to_string()),
            prior_turn: None,
        };
        let context = resolver.context_from_hints(&hints, None);
        let frame = resolver
            .resolve(&extract(&snapshot, "what does p53 do"), &context)
            .unwrap();

        let gene = frame.slot_entity(SlotName::Gene).unwrap();
        assert!(!gene.ambiguous);
        assert_eq!(gene.ontology_id, "NCBIGene:22059");
        assert_eq!(gene.resolution_confidence, 0.85);
        assert_eq!(frame.slot(SlotName::Species).unwrap().origin, SlotOrigin::Hint);
    }

    #[test]
    fn test_in_text_species_breaks_tie_outside_homology() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let resolver = SemanticResolver::new(&snapshot, &config);
        let frame = resolver
            .resolve(&extract(&snapshot, "what does p53 do in mouse"), &ResolutionContext::default())
            .unwrap();
        assert_eq!(frame.slot_entity(SlotName::Gene).unwrap().ontology_id, "NCBIGene:22059");
        assert!(!frame.is_ambiguous());
    }

    #[test]
    fn test_reject_policy_raises() {
        let snapshot = snapshot();
        let config = EngineConfig {
            ambiguity_policy: AmbiguityPolicy::Reject,
            ..EngineConfig::default()
        };
        let resolver = SemanticResolver::new(&snapshot, &config);
        let err = resolver
            .resolve(&extract(&snapshot, "what does p53 do"), &ResolutionContext::default())
            .unwrap_err();
        match err {
            QueryError::AmbiguousResolution { span, candidates } => {
                assert_eq!(span.surface, "p53");
                assert_eq!(candidates.len(), 2);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unresolved_gene_blocks_frame() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let resolver = SemanticResolver::new(&snapshot, &config);
        let err = resolver
            .resolve(&extract(&snapshot, "what is the function of ZZZ9"), &ResolutionContext::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnresolvedEntity { ref span, .. } if span.surface == "ZZZ9"));
    }

    #[test]
    fn test_unresolved_mention_blocks_fallback_to_weaker_intent() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let resolver = SemanticResolver::new(&snapshot, &config);
        let extraction = extract(&snapshot, "find differences between TP53 and FOO1");
        assert_eq!(extraction.draft_intent(), IntentKind::Comparison);

        let err = resolver.resolve(&extraction, &ResolutionContext::default()).unwrap_err();
        match err {
            QueryError::UnresolvedEntity { span, .. } => assert_eq!(span.surface, "FOO1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let resolver = SemanticResolver::new(&snapshot, &config);
        let extraction = extract(&snapshot, "find mouse homologs of p53");
        let first = resolver.resolve(&extraction, &ResolutionContext::default()).unwrap();
        let second = resolver.resolve(&extraction, &ResolutionContext::default()).unwrap();
        assert_eq!(first, second);
    }
}
