//! Slot filling for each intent

use super::entity_from_node;
use crate::config::EngineConfig;
use crate::extract::NormalizedText;
use crate::model::{
    AnnotationScope, CanonicalEntity, EntityKind, HomologyType, IntentKind, SlotFill, SlotName,
    SlotOrigin,
};
use crate::ontology::{NodeId, OntologySnapshot, OntologySource};
use std::collections::BTreeMap;

/// Words that mark the species right after them as the homology target
const TARGET_CUES: &[&str] = &["in", "to", "into", "for"];
/// Word stems that mark the species right before them as the target
/// ("mouse homologs", "the zebrafish version")
const TARGET_SUFFIX_CUES: &[&str] = &[
    "homolog",
    "ortholog",
    "paralog",
    "version",
    "counterpart",
    "equivalent",
];
/// Words that mark the species right after them as the homology source
const SOURCE_CUES: &[&str] = &["from"];
/// Word stems outside entity mentions that ask for pathways
const PATHWAY_CUES: &[&str] = &["pathway", "signaling", "signalling", "cascade"];

pub(crate) type Slots = BTreeMap<SlotName, SlotFill>;

pub(crate) struct SlotFiller<'a> {
    snapshot: &'a OntologySnapshot,
    config: &'a EngineConfig,
    text: &'a NormalizedText,
    entities: &'a [CanonicalEntity],
    hint_species: Option<&'a CanonicalEntity>,
}

impl<'a> SlotFiller<'a> {
    pub(crate) fn new(
        snapshot: &'a OntologySnapshot,
        config: &'a EngineConfig,
        text: &'a NormalizedText,
        entities: &'a [CanonicalEntity],
        hint_species: Option<&'a CanonicalEntity>,
    ) -> Self {
        Self {
            snapshot,
            config,
            text,
            entities,
            hint_species,
        }
    }

    /// Fill the slots of `intent` and report which required slots stayed empty
    pub(crate) fn fill(&self, intent: IntentKind) -> (Slots, Vec<SlotName>) {
        let mut slots = Slots::new();
        match intent {
            IntentKind::Lookup => self.fill_lookup(&mut slots),
            IntentKind::Homology => self.fill_homology(&mut slots),
            IntentKind::Interaction => {
                let gene = self.genes().into_iter().next();
                if let Some((gene, origin)) = &gene {
                    slots.insert(SlotName::Gene, SlotFill::entity(gene.clone(), *origin));
                }
                let partner = self.entities.iter().find(|e| {
                    SlotName::Partner.accepts().contains(&e.kind)
                        && gene
                            .as_ref()
                            .map(|(g, _)| g.ontology_id != e.ontology_id && !self.same_gene(g, e))
                            .unwrap_or(true)
                });
                if let Some(partner) = partner {
                    slots.insert(SlotName::Partner, SlotFill::entity(partner.clone(), SlotOrigin::Text));
                }
                self.fill_species(&mut slots);
            },
            IntentKind::Comparison => {
                let mut genes = self.genes().into_iter();
                if let Some((gene, origin)) = genes.next() {
                    slots.insert(SlotName::Gene, SlotFill::entity(gene, origin));
                }
                if let Some((other, origin)) = genes.next() {
                    slots.insert(SlotName::OtherGene, SlotFill::entity(other, origin));
                }
                self.fill_species(&mut slots);
            },
            IntentKind::Annotation => {
                if let Some((gene, origin)) = self.genes().into_iter().next() {
                    slots.insert(SlotName::Gene, SlotFill::entity(gene, origin));
                }
                if let Some(term) = self.most_specific_go_term() {
                    slots.insert(SlotName::GoTerm, SlotFill::entity(term.clone(), SlotOrigin::Text));
                }
                self.fill_species(&mut slots);
                let (scope, origin) = self.annotation_scope();
                slots.insert(SlotName::Scope, SlotFill::literal(scope.as_str(), origin));
            },
            IntentKind::Unsupported => {},
        }

        let missing = self
            .config
            .slot_requirements
            .required(intent)
            .iter()
            .filter(|slot| !slots.contains_key(slot))
            .copied()
            .collect();
        (slots, missing)
    }

    fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &'a CanonicalEntity> {
        let entities = self.entities;
        entities.iter().filter(move |e| e.kind == kind)
    }

    /// Gene mentions in text order, with proteins promoted to the gene
    /// they cross-reference when no gene of that id is mentioned directly
    fn genes(&self) -> Vec<(CanonicalEntity, SlotOrigin)> {
        let mut genes: Vec<(CanonicalEntity, SlotOrigin)> = Vec::new();
        for entity in self.entities {
            let promoted = match entity.kind {
                EntityKind::Gene => Some((entity.clone(), SlotOrigin::Text)),
                EntityKind::Protein => self
                    .snapshot
                    .xref_targets(entity.node, OntologySource::NcbiGene)
                    .into_iter()
                    .next()
                    .and_then(|node| {
                        entity_from_node(self.snapshot, node, entity.resolution_confidence)
                    })
                    .map(|mut gene| {
                        gene.mention = entity.mention.clone();
                        (gene, SlotOrigin::Inferred)
                    }),
                _ => None,
            };
            if let Some((gene, origin)) = promoted {
                if !genes.iter().any(|(g, _)| g.ontology_id == gene.ontology_id) {
                    genes.push((gene, origin));
                }
            }
        }
        genes
    }

    fn same_gene(&self, gene: &CanonicalEntity, other: &CanonicalEntity) -> bool {
        other.kind == EntityKind::Protein
            && self
                .snapshot
                .xref_targets(other.node, OntologySource::NcbiGene)
                .contains(&gene.node)
    }

    /// Lookup subject: the first non-species mention, else a species
    fn fill_lookup(&self, slots: &mut Slots) {
        let subject = self
            .entities
            .iter()
            .find(|e| e.kind != EntityKind::Species)
            .or_else(|| self.of_kind(EntityKind::Species).next());
        let Some(subject) = subject else {
            return;
        };
        slots.insert(SlotName::Subject, SlotFill::entity(subject.clone(), SlotOrigin::Text));

        if subject.kind != EntityKind::Species {
            if let Some(species) = self.of_kind(EntityKind::Species).next() {
                slots.insert(SlotName::Species, SlotFill::entity(species.clone(), SlotOrigin::Text));
            } else if let Some(hint) = self.hint_species {
                slots.insert(SlotName::Species, SlotFill::entity(hint.clone(), SlotOrigin::Hint));
            }
        }
    }

    /// Optional species slot: text, then hint, then the gene's own taxon
    fn fill_species(&self, slots: &mut Slots) {
        if let Some(species) = self.of_kind(EntityKind::Species).next() {
            slots.insert(SlotName::Species, SlotFill::entity(species.clone(), SlotOrigin::Text));
        } else if let Some(hint) = self.hint_species {
            slots.insert(SlotName::Species, SlotFill::entity(hint.clone(), SlotOrigin::Hint));
        } else if let Some(taxon) = slots
            .get(&SlotName::Gene)
            .and_then(|fill| fill.value.entity())
            .and_then(|gene| self.taxon_entity(gene.node))
        {
            slots.insert(SlotName::Species, SlotFill::entity(taxon, SlotOrigin::Inferred));
        }
    }

    fn taxon_entity(&self, node: NodeId) -> Option<CanonicalEntity> {
        let taxon = self.snapshot.taxon_of(node)?;
        entity_from_node(self.snapshot, taxon, 1.0)
    }

    fn word_before(&self, entity: &CanonicalEntity) -> Option<String> {
        let start = entity.mention.as_ref()?.start;
        let index = self.text.token_at(start)?;
        self.text.token_lower(index.checked_sub(1)?)
    }

    fn word_after(&self, entity: &CanonicalEntity) -> Option<String> {
        let end = entity.mention.as_ref()?.end;
        let index = self.text.token_ending_at(end)?;
        self.text.token_lower(index + 1)
    }

    /// The mentioned GO term no other mentioned term is a subclass of
    fn most_specific_go_term(&self) -> Option<&'a CanonicalEntity> {
        let terms: Vec<&CanonicalEntity> = self.of_kind(EntityKind::GoTerm).collect();
        terms.iter().copied().find(|term| {
            !terms
                .iter()
                .any(|other| other.node != term.node && self.snapshot.is_a(other.node, term.node))
        })
    }

    /// Pathway cues count only outside entity mentions, so a GO term such
    /// as "apoptotic signaling pathway" does not switch the scope
    fn annotation_scope(&self) -> (AnnotationScope, SlotOrigin) {
        let inside_mention = |start: usize, end: usize| {
            self.entities.iter().any(|e| {
                e.mention
                    .as_ref()
                    .is_some_and(|m| m.start <= start && end <= m.end)
            })
        };
        let cued = self
            .text
            .tokens
            .iter()
            .filter(|token| !inside_mention(token.start, token.end))
            .any(|token| {
                let word = token.text.to_lowercase();
                PATHWAY_CUES.iter().any(|cue| word.starts_with(cue))
            });
        if cued {
            (AnnotationScope::Pathways, SlotOrigin::Text)
        } else {
            (AnnotationScope::Function, SlotOrigin::Default)
        }
    }

    fn homology_type(&self) -> (HomologyType, SlotOrigin) {
        let lower = self.text.text.to_lowercase();
        if lower.contains("paralog") {
            (HomologyType::Paralogues, SlotOrigin::Text)
        } else if lower.contains("ortholog") || lower.contains("homolog") {
            (HomologyType::Orthologues, SlotOrigin::Text)
        } else {
            (HomologyType::Orthologues, SlotOrigin::Default)
        }
    }

    fn fill_homology(&self, slots: &mut Slots) {
        let gene = self.genes().into_iter().next();
        if let Some((gene, origin)) = &gene {
            slots.insert(SlotName::Gene, SlotFill::entity(gene.clone(), *origin));
        }
        let gene_taxon = gene
            .as_ref()
            .and_then(|(gene, _)| self.snapshot.taxon_of(gene.node));

        let (homology_type, type_origin) = self.homology_type();
        slots.insert(
            SlotName::HomologyType,
            SlotFill::literal(homology_type.as_str(), type_origin),
        );

        let mentioned: Vec<&CanonicalEntity> = self.of_kind(EntityKind::Species).collect();
        let mut source: Option<&CanonicalEntity> = None;
        let mut target: Option<&CanonicalEntity> = None;
        let mut uncued = Vec::new();
        for species in mentioned {
            let before = self.word_before(species);
            let after = self.word_after(species);
            let target_cue = before.as_deref().is_some_and(|w| TARGET_CUES.contains(&w))
                || after
                    .as_deref()
                    .is_some_and(|w| TARGET_SUFFIX_CUES.iter().any(|cue| w.starts_with(cue)));
            let source_cue = before.as_deref().is_some_and(|w| SOURCE_CUES.contains(&w));
            if target_cue && target.is_none() {
                target = Some(species);
            } else if source_cue && source.is_none() {
                source = Some(species);
            } else {
                uncued.push(species);
            }
        }
        match (target.is_none(), uncued.as_slice()) {
            (true, [only]) => target = Some(*only),
            (true, [first, .., last]) => {
                target = Some(*last);
                source = source.or(Some(*first));
            },
            (false, [first, ..]) => source = source.or(Some(*first)),
            _ => {},
        }

        if let Some(target) = target {
            slots.insert(SlotName::TargetSpecies, SlotFill::entity(target.clone(), SlotOrigin::Text));
        }

        let target_node = target.map(|t| t.node);
        let allow_same = homology_type == HomologyType::Paralogues;
        let usable = |node: NodeId| allow_same || Some(node) != target_node;

        let source_fill = source
            .filter(|s| usable(s.node))
            .map(|s| SlotFill::entity(s.clone(), SlotOrigin::Text))
            .or_else(|| {
                self.hint_species
                    .filter(|h| usable(h.node))
                    .map(|h| SlotFill::entity(h.clone(), SlotOrigin::Hint))
            })
            .or_else(|| {
                gene_taxon
                    .filter(|node| usable(*node))
                    .and_then(|node| entity_from_node(self.snapshot, node, 1.0))
                    .map(|taxon| SlotFill::entity(taxon, SlotOrigin::Inferred))
            })
            .or_else(|| {
                self.snapshot
                    .lookup_id(&self.config.default_species)
                    .filter(|node| usable(*node))
                    .and_then(|node| entity_from_node(self.snapshot, node, 1.0))
                    .map(|taxon| SlotFill::entity(taxon, SlotOrigin::Default))
            });

        if let Some(fill) = source_fill {
            if allow_same && target.is_none() {
                slots.insert(
                    SlotName::TargetSpecies,
                    SlotFill {
                        value: fill.value.clone(),
                        origin: SlotOrigin::Inferred,
                    },
                );
            }
            slots.insert(SlotName::SourceSpecies, fill);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extract::normalize;
    use crate::model::EntitySpan;
    use crate::ontology::{parse_snapshot, SnapshotFormat};

    const SNAPSHOT: &str = r#"{
        "version": "slots-test",
        "records": {
            "NCBITaxon:9606": {"source": "ncbi_taxonomy", "label": "Homo sapiens", "synonyms": ["human"]},
            "NCBITaxon:10090": {"source": "ncbi_taxonomy", "label": "Mus musculus", "synonyms": ["mouse", "mice"]},
            "NCBITaxon:7955": {"source": "ncbi_taxonomy", "label": "Danio rerio", "synonyms": ["zebrafish"]},
            "NCBIGene:7157": {"source": "ncbi_gene", "label": "TP53", "xrefs": ["NCBITaxon:9606"]},
            "NCBIGene:672": {"source": "ncbi_gene", "label": "BRCA1", "xrefs": ["NCBITaxon:9606"]},
            "PR:000003035": {"source": "pro", "label": "cellular tumor antigen p53", "xrefs": ["NCBIGene:7157"]},
            "GO:0008150": {"source": "go", "label": "biological_process"},
            "GO:0006915": {"source": "go", "label": "apoptotic process", "parents": ["GO:0008150"]},
            "GO:0097190": {"source": "go", "label": "apoptotic signaling pathway", "parents": ["GO:0006915"]}
        }
    }"#;

    fn snapshot() -> OntologySnapshot {
        parse_snapshot(SNAPSHOT, SnapshotFormat::Json, &OntologySource::ALL).unwrap()
    }

    /// Entity for `id` mentioned at the first occurrence of `surface`
    fn mention(snapshot: &OntologySnapshot, text: &NormalizedText, id: &str, surface: &str) -> CanonicalEntity {
        let node = snapshot.lookup_id(id).unwrap();
        let mut entity = entity_from_node(snapshot, node, 1.0).unwrap();
        let byte = text.text.find(surface).unwrap();
        let start = text.text[..byte].chars().count();
        entity.mention = Some(EntitySpan::new(
            surface,
            start,
            start + surface.chars().count(),
            entity.kind,
            1.0,
        ));
        entity
    }

    fn id_of(slots: &Slots, slot: SlotName) -> Option<&str> {
        slots
            .get(&slot)
            .and_then(|fill| fill.value.entity())
            .map(|e| e.ontology_id.as_str())
    }

    #[test]
    fn test_homology_target_from_cue_and_source_from_gene_taxon() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text = normalize("find homologs of TP53 in mice").unwrap();
        let entities = vec![
            mention(&snapshot, &text, "NCBIGene:7157", "TP53"),
            mention(&snapshot, &text, "NCBITaxon:10090", "mice"),
        ];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (slots, missing) = filler.fill(IntentKind::Homology);

        assert!(missing.is_empty());
        assert_eq!(id_of(&slots, SlotName::TargetSpecies), Some("NCBITaxon:10090"));
        assert_eq!(id_of(&slots, SlotName::SourceSpecies), Some("NCBITaxon:9606"));
        assert_eq!(slots[&SlotName::SourceSpecies].origin, SlotOrigin::Inferred);
        assert_eq!(slots[&SlotName::HomologyType].value.literal(), Some("orthologues"));
        assert_eq!(slots[&SlotName::HomologyType].origin, SlotOrigin::Text);
    }

    #[test]
    fn test_homology_two_species_with_cues() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text = normalize("zebrafish version of TP53 from human").unwrap();
        let entities = vec![
            mention(&snapshot, &text, "NCBITaxon:7955", "zebrafish"),
            mention(&snapshot, &text, "NCBIGene:7157", "TP53"),
            mention(&snapshot, &text, "NCBITaxon:9606", "human"),
        ];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (slots, _) = filler.fill(IntentKind::Homology);

        assert_eq!(id_of(&slots, SlotName::TargetSpecies), Some("NCBITaxon:7955"));
        assert_eq!(id_of(&slots, SlotName::SourceSpecies), Some("NCBITaxon:9606"));
        assert_eq!(slots[&SlotName::SourceSpecies].origin, SlotOrigin::Text);
        assert_eq!(slots[&SlotName::HomologyType].origin, SlotOrigin::Default);
    }

    #[test]
    fn test_homology_without_target_is_missing() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text = normalize("orthologs of TP53").unwrap();
        let entities = vec![mention(&snapshot, &text, "NCBIGene:7157", "TP53")];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (_, missing) = filler.fill(IntentKind::Homology);
        assert_eq!(missing, vec![SlotName::TargetSpecies]);
    }

    #[test]
    fn test_protein_promoted_to_gene() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text = normalize("what does cellular tumor antigen p53 do").unwrap();
        let entities = vec![mention(
            &snapshot,
            &text,
            "PR:000003035",
            "cellular tumor antigen p53",
        )];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (slots, missing) = filler.fill(IntentKind::Annotation);

        assert!(missing.is_empty());
        assert_eq!(id_of(&slots, SlotName::Gene), Some("NCBIGene:7157"));
        assert_eq!(slots[&SlotName::Gene].origin, SlotOrigin::Inferred);
        assert_eq!(id_of(&slots, SlotName::Species), Some("NCBITaxon:9606"));
    }

    #[test]
    fn test_lookup_prefers_non_species_subject() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text = normalize("tell me about mouse BRCA1").unwrap();
        let entities = vec![
            mention(&snapshot, &text, "NCBITaxon:10090", "mouse"),
            mention(&snapshot, &text, "NCBIGene:672", "BRCA1"),
        ];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (slots, _) = filler.fill(IntentKind::Lookup);
        assert_eq!(id_of(&slots, SlotName::Subject), Some("NCBIGene:672"));
        assert_eq!(id_of(&slots, SlotName::Species), Some("NCBITaxon:10090"));
    }

    #[test]
    fn test_comparison_needs_two_genes() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text = normalize("compare TP53 and BRCA1").unwrap();
        let entities = vec![
            mention(&snapshot, &text, "NCBIGene:7157", "TP53"),
            mention(&snapshot, &text, "NCBIGene:672", "BRCA1"),
        ];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (slots, missing) = filler.fill(IntentKind::Comparison);
        assert!(missing.is_empty());
        assert_eq!(id_of(&slots, SlotName::OtherGene), Some("NCBIGene:672"));

        let (_, missing) = filler.fill(IntentKind::Interaction);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_annotation_prefers_most_specific_go_term() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text =
            normalize("is TP53 in apoptotic process through apoptotic signaling pathway").unwrap();
        let entities = vec![
            mention(&snapshot, &text, "NCBIGene:7157", "TP53"),
            mention(&snapshot, &text, "GO:0006915", "apoptotic process"),
            mention(&snapshot, &text, "GO:0097190", "apoptotic signaling pathway"),
        ];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (slots, missing) = filler.fill(IntentKind::Annotation);

        assert!(missing.is_empty());
        assert_eq!(id_of(&slots, SlotName::GoTerm), Some("GO:0097190"));
        assert_eq!(slots[&SlotName::Scope].value.literal(), Some("function"));
        assert_eq!(slots[&SlotName::Scope].origin, SlotOrigin::Default);
    }

    #[test]
    fn test_pathway_cue_sets_annotation_scope() {
        let snapshot = snapshot();
        let config = EngineConfig::default();
        let text = normalize("which signaling pathways involve TP53").unwrap();
        let entities = vec![mention(&snapshot, &text, "NCBIGene:7157", "TP53")];
        let filler = SlotFiller::new(&snapshot, &config, &text, &entities, None);
        let (slots, _) = filler.fill(IntentKind::Annotation);

        assert_eq!(slots[&SlotName::Scope].value.literal(), Some("pathways"));
        assert_eq!(slots[&SlotName::Scope].origin, SlotOrigin::Text);
    }
}
