//! Response validation and normalization
//!
//! Every [`ResponseShape`] has a typed wire model. A response that does not
//! deserialize into the model for its descriptor's shape is `malformed`.
//! Valid responses yield output fields for placeholder substitution and a
//! list of facts in the shared internal schema.

use super::client::{ServiceCall, ServiceFailure};
use crate::model::ResponseShape;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Result of normalizing one response
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Normalized {
    /// Values later descriptors may reference, by field name
    pub outputs: BTreeMap<String, String>,
    /// `(kind, data)` pairs in response order
    pub facts: Vec<(String, Value)>,
}

impl Normalized {
    fn output(mut self, field: &str, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.outputs.insert(field.to_string(), value);
        }
        self
    }

    fn fact(mut self, kind: &str, data: Value) -> Self {
        self.facts.push((kind.to_string(), data));
        self
    }
}

/// An id that services send either as a JSON string or as a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum LooseId {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for LooseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LooseId::Text(text) => f.write_str(text),
            LooseId::Number(number) => write!(f, "{}", number),
        }
    }
}

// ---------------------------------------------------------------------------
// Entrez
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    count: Option<LooseId>,
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ESummaryResponse {
    result: ESummaryResult,
}

#[derive(Debug, Deserialize)]
struct ESummaryResult {
    uids: Vec<String>,
    #[serde(flatten)]
    records: BTreeMap<String, Value>,
}

impl ESummaryResult {
    fn first<T: DeserializeOwned>(&self) -> Result<Option<(String, T)>, ServiceFailure> {
        let Some(uid) = self.uids.first() else {
            return Ok(None);
        };
        let record = self
            .records
            .get(uid)
            .cloned()
            .ok_or_else(|| ServiceFailure::malformed(format!("esummary has no record for uid {}", uid)))?;
        let record = serde_json::from_value(record)
            .map_err(|e| ServiceFailure::malformed(format!("esummary record {}: {}", uid, e)))?;
        Ok(Some((uid.clone(), record)))
    }
}

#[derive(Debug, Deserialize)]
struct GeneDocSum {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    chromosome: String,
    #[serde(default)]
    maplocation: String,
    #[serde(default)]
    organism: Option<GeneOrganism>,
}

#[derive(Debug, Deserialize)]
struct GeneOrganism {
    scientificname: String,
    #[serde(default)]
    taxid: Option<LooseId>,
}

#[derive(Debug, Deserialize)]
struct TaxonDocSum {
    scientificname: String,
    #[serde(default)]
    commonname: String,
    #[serde(default)]
    rank: String,
    #[serde(default)]
    division: String,
}

// ---------------------------------------------------------------------------
// Ensembl
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EnsemblGene {
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    species: String,
    #[serde(default)]
    biotype: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    seq_region_name: String,
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
    #[serde(default)]
    strand: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EnsemblHomologyResponse {
    data: Vec<EnsemblHomologyGroup>,
}

#[derive(Debug, Deserialize)]
struct EnsemblHomologyGroup {
    #[serde(default)]
    id: String,
    homologies: Vec<EnsemblHomology>,
}

#[derive(Debug, Deserialize)]
struct EnsemblHomology {
    #[serde(rename = "type")]
    kind: String,
    target: EnsemblHomologyTarget,
}

#[derive(Debug, Deserialize)]
struct EnsemblHomologyTarget {
    id: String,
    species: String,
    #[serde(default)]
    taxon_id: Option<LooseId>,
    #[serde(default)]
    protein_id: Option<String>,
    #[serde(default)]
    perc_id: Option<f64>,
}

// ---------------------------------------------------------------------------
// QuickGO
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QuickGoTerms {
    results: Vec<QuickGoTerm>,
}

#[derive(Debug, Deserialize)]
struct QuickGoTerm {
    id: String,
    name: String,
    #[serde(default)]
    aspect: String,
    #[serde(default)]
    definition: Option<QuickGoDefinition>,
    #[serde(default, rename = "isObsolete")]
    is_obsolete: bool,
}

#[derive(Debug, Deserialize)]
struct QuickGoDefinition {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuickGoAnnotations {
    #[serde(default)]
    number_of_hits: Option<u64>,
    results: Vec<QuickGoAnnotation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuickGoAnnotation {
    go_id: String,
    #[serde(default)]
    go_name: Option<String>,
    #[serde(default)]
    go_aspect: String,
    #[serde(default)]
    evidence_code: String,
    #[serde(default)]
    qualifier: String,
    #[serde(default)]
    gene_product_id: String,
}

// ---------------------------------------------------------------------------
// STRING
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StringInteraction {
    #[serde(rename = "preferredName_A")]
    preferred_name_a: String,
    #[serde(rename = "preferredName_B")]
    preferred_name_b: String,
    #[serde(rename = "stringId_B", default)]
    string_id_b: String,
    #[serde(rename = "ncbiTaxonId", default)]
    ncbi_taxon_id: Option<LooseId>,
    score: f64,
}

// ---------------------------------------------------------------------------
// Reactome
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReactomePathway {
    st_id: String,
    display_name: String,
    #[serde(default)]
    species_name: Option<String>,
    #[serde(default)]
    is_in_disease: bool,
}

fn parse<T: DeserializeOwned>(shape: ResponseShape, value: &Value) -> Result<T, ServiceFailure> {
    T::deserialize(value)
        .map_err(|e| ServiceFailure::malformed(format!("response is not a {}: {}", shape, e)))
}

/// Validate a response against `shape` and normalize it
pub(crate) fn normalize_response(
    shape: ResponseShape,
    call: &ServiceCall,
    value: &Value,
) -> Result<Normalized, ServiceFailure> {
    let normalized = Normalized::default();
    let normalized = match shape {
        ResponseShape::TaxonRecord => {
            let response: ESearchResponse = parse(shape, value)?;
            let taxon_id = response.esearchresult.idlist.first().cloned();
            let term = call.parameters.get("term").cloned().unwrap_or_default();
            match taxon_id {
                Some(id) => normalized
                    .output("taxon_id", Some(id.clone()))
                    .fact("taxon", json!({ "taxon_id": id, "query": term })),
                None => normalized,
            }
        },
        ResponseShape::SearchResult => {
            let response: ESearchResponse = parse(shape, value)?;
            let result = response.esearchresult;
            let count = result
                .count
                .map(|c| c.to_string())
                .unwrap_or_else(|| result.idlist.len().to_string());
            normalized.fact(
                "search_hits",
                json!({
                    "db": call.parameters.get("db"),
                    "term": call.parameters.get("term"),
                    "count": count,
                    "ids": result.idlist,
                }),
            )
        },
        ResponseShape::GeneSummary => {
            let response: ESummaryResponse = parse(shape, value)?;
            match response.result.first::<GeneDocSum>()? {
                Some((uid, gene)) => normalized
                    .output("gene_id", Some(uid.clone()))
                    .output("symbol", Some(gene.name.clone()))
                    .fact(
                        "gene_summary",
                        json!({
                            "gene_id": uid,
                            "symbol": gene.name,
                            "description": gene.description,
                            "summary": gene.summary,
                            "chromosome": gene.chromosome,
                            "map_location": gene.maplocation,
                            "organism": gene.organism.as_ref().map(|o| o.scientificname.clone()),
                            "taxon_id": gene.organism.and_then(|o| o.taxid).map(|t| t.to_string()),
                        }),
                    ),
                None => normalized,
            }
        },
        ResponseShape::TaxonomySummary => {
            let response: ESummaryResponse = parse(shape, value)?;
            match response.result.first::<TaxonDocSum>()? {
                Some((uid, taxon)) => normalized.fact(
                    "taxonomy_summary",
                    json!({
                        "taxon_id": uid,
                        "scientific_name": taxon.scientificname,
                        "common_name": taxon.commonname,
                        "rank": taxon.rank,
                        "division": taxon.division,
                    }),
                ),
                None => normalized,
            }
        },
        ResponseShape::GeneRecord => {
            let gene: EnsemblGene = parse(shape, value)?;
            normalized.output("ensembl_id", Some(gene.id.clone())).fact(
                "ensembl_gene",
                json!({
                    "ensembl_id": gene.id,
                    "symbol": gene.display_name,
                    "species": gene.species,
                    "biotype": gene.biotype,
                    "description": gene.description,
                    "location": {
                        "region": gene.seq_region_name,
                        "start": gene.start,
                        "end": gene.end,
                        "strand": gene.strand,
                    },
                }),
            )
        },
        ResponseShape::HomologyGroups => {
            let response: EnsemblHomologyResponse = parse(shape, value)?;
            response
                .data
                .into_iter()
                .flat_map(|group| {
                    let query = group.id;
                    group
                        .homologies
                        .into_iter()
                        .map(move |homology| (query.clone(), homology))
                })
                .fold(normalized, |acc, (query, homology)| {
                    acc.fact(
                        "homolog",
                        json!({
                            "query_gene": query,
                            "homology_type": homology.kind,
                            "ensembl_id": homology.target.id,
                            "species": homology.target.species,
                            "taxon_id": homology.target.taxon_id.map(|t| t.to_string()),
                            "protein_id": homology.target.protein_id,
                            "percent_identity": homology.target.perc_id,
                        }),
                    )
                })
        },
        ResponseShape::GoTerm => {
            let response: QuickGoTerms = parse(shape, value)?;
            response.results.into_iter().fold(normalized, |acc, term| {
                acc.fact(
                    "go_term",
                    json!({
                        "go_id": term.id,
                        "name": term.name,
                        "aspect": term.aspect,
                        "definition": term.definition.map(|d| d.text),
                        "obsolete": term.is_obsolete,
                    }),
                )
            })
        },
        ResponseShape::GoAnnotations => {
            let response: QuickGoAnnotations = parse(shape, value)?;
            let hits = response.number_of_hits;
            let normalized = response.results.into_iter().fold(normalized, |acc, annotation| {
                acc.fact(
                    "go_annotation",
                    json!({
                        "go_id": annotation.go_id,
                        "go_name": annotation.go_name,
                        "aspect": annotation.go_aspect,
                        "evidence_code": annotation.evidence_code,
                        "qualifier": annotation.qualifier,
                        "gene_product": annotation.gene_product_id,
                    }),
                )
            });
            let returned = normalized.facts.len();
            match hits {
                Some(total) if total as usize > returned => normalized.fact(
                    "annotation_count",
                    json!({ "total": total, "returned": returned }),
                ),
                _ => normalized,
            }
        },
        ResponseShape::PathwayList => {
            let pathways: Vec<ReactomePathway> = parse(shape, value)?;
            pathways.into_iter().fold(normalized, |acc, pathway| {
                acc.fact(
                    "pathway",
                    json!({
                        "pathway_id": pathway.st_id,
                        "name": pathway.display_name,
                        "species": pathway.species_name,
                        "in_disease": pathway.is_in_disease,
                        "source": "Reactome",
                    }),
                )
            })
        },
        ResponseShape::InteractionPartners => {
            let interactions: Vec<StringInteraction> = parse(shape, value)?;
            interactions.into_iter().fold(normalized, |acc, interaction| {
                acc.fact(
                    "interaction",
                    json!({
                        "protein": interaction.preferred_name_a,
                        "partner": interaction.preferred_name_b,
                        "partner_string_id": interaction.string_id_b,
                        "taxon_id": interaction.ncbi_taxon_id.map(|t| t.to_string()),
                        "score": interaction.score,
                    }),
                )
            })
        },
    };
    Ok(normalized)
}
