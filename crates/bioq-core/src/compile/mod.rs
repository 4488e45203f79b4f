//! Query plan compiler
//!
//! A complete [`SemanticFrame`] is first bound into a [`BoundIntent`], a sum
//! type with one variant per compilable intent and its slot values already
//! extracted. The rule table is an exhaustive `match` over that type, so
//! adding an intent without a rule does not build.

mod plan;

use crate::error::QueryError;
use crate::model::{
    AnnotationScope, CanonicalEntity, EntityKind, FrameStatus, HomologyType, IntentKind,
    QueryDescriptor, ResponseShape, SemanticFrame, ServiceKind, SlotName,
};
use crate::ontology::{OntologySnapshot, OntologySource};
use plan::PlanBuilder;
use tracing::{debug, instrument};

/// STRING confidence cut-off (0-1000) for interaction partners
pub const STRING_REQUIRED_SCORE: u32 = 700;

/// Most GO ids sent in one QuickGO `go_id` filter
pub const MAX_GO_EXPANSION: usize = 50;

/// A complete frame with its slots pulled out and typed
#[derive(Debug, Clone, Copy)]
pub enum BoundIntent<'f> {
    Lookup {
        subject: &'f CanonicalEntity,
        species: Option<&'f CanonicalEntity>,
    },
    Homology {
        gene: &'f CanonicalEntity,
        source_species: &'f CanonicalEntity,
        target_species: &'f CanonicalEntity,
        homology_type: HomologyType,
    },
    Interaction {
        gene: &'f CanonicalEntity,
        partner: Option<&'f CanonicalEntity>,
        species: Option<&'f CanonicalEntity>,
    },
    Comparison {
        gene: &'f CanonicalEntity,
        other_gene: &'f CanonicalEntity,
        species: Option<&'f CanonicalEntity>,
    },
    Annotation {
        gene: &'f CanonicalEntity,
        go_term: Option<&'f CanonicalEntity>,
        species: Option<&'f CanonicalEntity>,
        scope: AnnotationScope,
    },
}

impl<'f> BoundIntent<'f> {
    /// Bind a frame; incomplete and unsupported frames have no rule
    pub fn bind(frame: &'f SemanticFrame) -> Result<Self, QueryError> {
        if let FrameStatus::Incomplete { missing } = &frame.status {
            return Err(QueryError::UnsupportedIntent {
                intent: frame.intent,
                reason: format!(
                    "frame is incomplete (missing {})",
                    missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ),
            });
        }

        let required = |slot: SlotName| {
            frame
                .slot_entity(slot)
                .ok_or_else(|| QueryError::UnsupportedIntent {
                    intent: frame.intent,
                    reason: format!("slot '{}' holds no entity", slot),
                })
        };
        let optional = |slot: SlotName| frame.slot_entity(slot);

        let bound = match frame.intent {
            IntentKind::Lookup => BoundIntent::Lookup {
                subject: required(SlotName::Subject)?,
                species: optional(SlotName::Species),
            },
            IntentKind::Homology => BoundIntent::Homology {
                gene: required(SlotName::Gene)?,
                source_species: required(SlotName::SourceSpecies)?,
                target_species: required(SlotName::TargetSpecies)?,
                homology_type: frame
                    .slot(SlotName::HomologyType)
                    .and_then(|fill| fill.value.literal())
                    .and_then(HomologyType::parse)
                    .unwrap_or(HomologyType::Orthologues),
            },
            IntentKind::Interaction => BoundIntent::Interaction {
                gene: required(SlotName::Gene)?,
                partner: optional(SlotName::Partner),
                species: optional(SlotName::Species),
            },
            IntentKind::Comparison => BoundIntent::Comparison {
                gene: required(SlotName::Gene)?,
                other_gene: required(SlotName::OtherGene)?,
                species: optional(SlotName::Species),
            },
            IntentKind::Annotation => BoundIntent::Annotation {
                gene: required(SlotName::Gene)?,
                go_term: optional(SlotName::GoTerm),
                species: optional(SlotName::Species),
                scope: frame
                    .slot(SlotName::Scope)
                    .and_then(|fill| fill.value.literal())
                    .and_then(AnnotationScope::parse)
                    .unwrap_or_default(),
            },
            IntentKind::Unsupported => {
                return Err(QueryError::UnsupportedIntent {
                    intent: IntentKind::Unsupported,
                    reason: "sequence, structure and alignment requests have no data service"
                        .to_string(),
                })
            },
        };
        Ok(bound)
    }

    pub fn intent(&self) -> IntentKind {
        match self {
            BoundIntent::Lookup { .. } => IntentKind::Lookup,
            BoundIntent::Homology { .. } => IntentKind::Homology,
            BoundIntent::Interaction { .. } => IntentKind::Interaction,
            BoundIntent::Comparison { .. } => IntentKind::Comparison,
            BoundIntent::Annotation { .. } => IntentKind::Annotation,
        }
    }
}

/// Compiles complete frames into ordered descriptor lists
pub struct QueryCompiler<'a> {
    snapshot: &'a OntologySnapshot,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(snapshot: &'a OntologySnapshot) -> Self {
        Self { snapshot }
    }

    #[instrument(skip_all, fields(intent = %frame.intent))]
    pub fn compile(&self, frame: &SemanticFrame) -> Result<Vec<QueryDescriptor>, QueryError> {
        let bound = BoundIntent::bind(frame)?;
        let mut plan = PlanBuilder::new();

        match bound {
            BoundIntent::Homology {
                gene,
                source_species,
                target_species,
                homology_type,
            } => {
                let taxon = plan
                    .call(
                        ServiceKind::Entrez,
                        "taxonomy_search",
                        ResponseShape::TaxonRecord,
                        &target_species.ontology_id,
                    )
                    .param("db", "taxonomy")
                    .param("term", target_species.display_name.as_str())
                    .push();
                plan.call(
                    ServiceKind::Ensembl,
                    "homology_symbol",
                    ResponseShape::HomologyGroups,
                    &gene.ontology_id,
                )
                .param("species", self.ensembl_species(source_species))
                .param("symbol", self.symbol(gene))
                .param_ref("target_taxon", taxon, "taxon_id")
                .param("type", homology_type.as_str())
                .push();
            },
            BoundIntent::Lookup { subject, species } => {
                self.compile_lookup(&mut plan, subject, species);
            },
            BoundIntent::Interaction {
                gene,
                partner,
                species,
            } => {
                let taxon = species
                    .map(|s| s.local_id().to_string())
                    .or_else(|| self.taxon_id_of(gene));
                plan.call(
                    ServiceKind::StringDb,
                    "interaction_partners",
                    ResponseShape::InteractionPartners,
                    &gene.ontology_id,
                )
                .param("identifiers", self.symbol(gene))
                .param_opt("species", taxon)
                .param("required_score", STRING_REQUIRED_SCORE.to_string())
                .param_opt("partner", partner.map(|p| self.symbol(p)))
                .push();
            },
            BoundIntent::Comparison {
                gene, other_gene, ..
            } => {
                for entity in [gene, other_gene] {
                    self.gene_summary(&mut plan, entity, &entity.ontology_id);
                }
            },
            BoundIntent::Annotation {
                gene,
                go_term,
                species,
                scope,
            } => {
                self.gene_summary(&mut plan, gene, &gene.ontology_id);
                let taxon = species
                    .map(|s| s.local_id().to_string())
                    .or_else(|| self.taxon_id_of(gene));
                let species_name = self.species_name(gene, species);
                match (scope, species_name) {
                    (AnnotationScope::Pathways, Some(species_name)) => {
                        let record = plan
                            .call(
                                ServiceKind::Ensembl,
                                "lookup_symbol",
                                ResponseShape::GeneRecord,
                                &gene.ontology_id,
                            )
                            .param("species", species_name)
                            .param("symbol", self.symbol(gene))
                            .push();
                        plan.call(
                            ServiceKind::Reactome,
                            "mapping_pathways",
                            ResponseShape::PathwayList,
                            &gene.ontology_id,
                        )
                        .param("resource", "ENSEMBL")
                        .param_ref("identifier", record, "ensembl_id")
                        .param_opt("species", taxon)
                        .push();
                    },
                    _ => {
                        plan.call(
                            ServiceKind::QuickGo,
                            "annotations",
                            ResponseShape::GoAnnotations,
                            &gene.ontology_id,
                        )
                        .param("gene_symbol", self.symbol(gene))
                        .param_opt("taxon_id", taxon)
                        .param_opt("go_id", go_term.map(|t| self.go_filter(t)))
                        .push();
                    },
                }
            },
        }

        let descriptors = plan.finish();
        debug!(
            descriptors = descriptors.len(),
            intent = %bound.intent(),
            "frame compiled"
        );
        Ok(descriptors)
    }

    fn compile_lookup(
        &self,
        plan: &mut PlanBuilder,
        subject: &CanonicalEntity,
        species: Option<&CanonicalEntity>,
    ) {
        match subject.kind {
            EntityKind::Gene => self.gene_lookup(plan, subject, species, &subject.ontology_id),
            EntityKind::Protein => {
                let gene = self
                    .snapshot
                    .xref_targets(subject.node, OntologySource::NcbiGene)
                    .into_iter()
                    .next()
                    .and_then(|node| crate::resolve::entity_from_node(self.snapshot, node, 1.0));
                match gene {
                    Some(gene) => self.gene_lookup(plan, &gene, species, &subject.ontology_id),
                    None => self.search(plan, subject, "protein"),
                }
            },
            EntityKind::Species => {
                plan.call(
                    ServiceKind::Entrez,
                    "taxonomy_summary",
                    ResponseShape::TaxonomySummary,
                    &subject.ontology_id,
                )
                .param("db", "taxonomy")
                .param("id", subject.local_id())
                .push();
            },
            EntityKind::Chemical => self.search(plan, subject, "pccompound"),
            EntityKind::Disease => self.search(plan, subject, "medgen"),
            EntityKind::GoTerm => {
                plan.call(
                    ServiceKind::QuickGo,
                    "term",
                    ResponseShape::GoTerm,
                    &subject.ontology_id,
                )
                .param("ids", subject.ontology_id.as_str())
                .push();
            },
        }
    }

    /// Entrez summary plus the Ensembl record for the gene's species
    fn gene_lookup(
        &self,
        plan: &mut PlanBuilder,
        gene: &CanonicalEntity,
        species: Option<&CanonicalEntity>,
        subject: &str,
    ) {
        self.gene_summary(plan, gene, subject);

        if let Some(species_name) = self.species_name(gene, species) {
            plan.call(
                ServiceKind::Ensembl,
                "lookup_symbol",
                ResponseShape::GeneRecord,
                subject,
            )
            .param("species", species_name)
            .param("symbol", self.symbol(gene))
            .push();
        }
    }

    /// Ensembl species for a gene: the named species, else the gene's taxon
    fn species_name(
        &self,
        gene: &CanonicalEntity,
        species: Option<&CanonicalEntity>,
    ) -> Option<String> {
        species.map(|s| self.ensembl_species(s)).or_else(|| {
            let taxon = self.snapshot.taxon_of(gene.node)?;
            let taxon = crate::resolve::entity_from_node(self.snapshot, taxon, 1.0)?;
            Some(self.ensembl_species(&taxon))
        })
    }

    /// The term and its narrower terms, since QuickGO matches `go_id`
    /// exactly and annotations are made to the most specific term
    fn go_filter(&self, term: &CanonicalEntity) -> String {
        let mut narrower: Vec<&str> = self
            .snapshot
            .descendants(term.node)
            .into_iter()
            .filter_map(|node| self.snapshot.get(node))
            .map(|record| record.id.as_str())
            .collect();
        narrower.sort_unstable();
        narrower.truncate(MAX_GO_EXPANSION.saturating_sub(1));

        std::iter::once(term.ontology_id.as_str())
            .chain(narrower)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn gene_summary(&self, plan: &mut PlanBuilder, gene: &CanonicalEntity, subject: &str) {
        plan.call(
            ServiceKind::Entrez,
            "gene_summary",
            ResponseShape::GeneSummary,
            subject,
        )
        .param("db", "gene")
        .param("id", gene.local_id())
        .push();
    }

    fn search(&self, plan: &mut PlanBuilder, entity: &CanonicalEntity, db: &str) {
        plan.call(
            ServiceKind::Entrez,
            "esearch",
            ResponseShape::SearchResult,
            &entity.ontology_id,
        )
        .param("db", db)
        .param("term", entity.display_name.as_str())
        .push();
    }

    /// Ensembl production name (`mus_musculus`), from the record's
    /// `ensembl_name` attribute or derived from the scientific name
    fn ensembl_species(&self, species: &CanonicalEntity) -> String {
        self.snapshot
            .get(species.node)
            .and_then(|node| node.attribute("ensembl_name"))
            .map(str::to_string)
            .unwrap_or_else(|| {
                species
                    .display_name
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("_")
                    .to_lowercase()
            })
    }

    fn symbol(&self, entity: &CanonicalEntity) -> String {
        self.snapshot
            .get(entity.node)
            .and_then(|node| node.attribute("symbol"))
            .unwrap_or(&entity.display_name)
            .to_string()
    }

    fn taxon_id_of(&self, entity: &CanonicalEntity) -> Option<String> {
        let taxon = self.snapshot.taxon_of(entity.node)?;
        let record = self.snapshot.get(taxon)?;
        record.id.split_once(':').map(|(_, local)| local.to_string())
    }
}
