use super::frame::SemanticFrame;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// External data service a descriptor targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Entrez,
    Ensembl,
    #[serde(rename = "quickgo")]
    QuickGo,
    StringDb,
    Reactome,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Entrez => "entrez",
            ServiceKind::Ensembl => "ensembl",
            ServiceKind::QuickGo => "quickgo",
            ServiceKind::StringDb => "string_db",
            ServiceKind::Reactome => "reactome",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a descriptor in its plan, rendered `d0`, `d1`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorId(pub u16);

impl DescriptorId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl std::fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// A descriptor parameter: a fixed value or a placeholder filled from an
/// earlier descriptor's response at execution time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Literal(String),
    Ref { descriptor: DescriptorId, field: String },
}

impl ParamValue {
    pub fn literal(value: impl Into<String>) -> Self {
        ParamValue::Literal(value.into())
    }

    pub fn reference(descriptor: DescriptorId, field: impl Into<String>) -> Self {
        ParamValue::Ref {
            descriptor,
            field: field.into(),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Literal(value) => f.write_str(value),
            ParamValue::Ref { descriptor, field } => write!(f, "${{{}.{}}}", descriptor, field),
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Structure a service response is expected to have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Entrez esearch over the taxonomy database
    TaxonRecord,
    /// Ensembl homology/symbol
    HomologyGroups,
    /// Entrez esummary over the gene database
    GeneSummary,
    /// Ensembl lookup/symbol
    GeneRecord,
    /// Entrez esummary over the taxonomy database
    TaxonomySummary,
    /// Generic Entrez esearch
    SearchResult,
    /// QuickGO term lookup
    GoTerm,
    /// QuickGO annotation search
    GoAnnotations,
    /// STRING interaction_partners
    InteractionPartners,
    /// Reactome pathways an identifier maps to
    PathwayList,
}

impl ResponseShape {
    /// Fields later descriptors may reference through placeholders
    pub fn output_fields(self) -> &'static [&'static str] {
        match self {
            ResponseShape::TaxonRecord => &["taxon_id"],
            ResponseShape::GeneSummary => &["gene_id", "symbol"],
            ResponseShape::GeneRecord => &["ensembl_id"],
            ResponseShape::HomologyGroups
            | ResponseShape::TaxonomySummary
            | ResponseShape::SearchResult
            | ResponseShape::GoTerm
            | ResponseShape::GoAnnotations
            | ResponseShape::InteractionPartners
            | ResponseShape::PathwayList => &[],
        }
    }
}

impl std::fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseShape::TaxonRecord => "taxon_record",
            ResponseShape::HomologyGroups => "homology_groups",
            ResponseShape::GeneSummary => "gene_summary",
            ResponseShape::GeneRecord => "gene_record",
            ResponseShape::TaxonomySummary => "taxonomy_summary",
            ResponseShape::SearchResult => "search_result",
            ResponseShape::GoTerm => "go_term",
            ResponseShape::GoAnnotations => "go_annotations",
            ResponseShape::InteractionPartners => "interaction_partners",
            ResponseShape::PathwayList => "pathway_list",
        };
        f.write_str(name)
    }
}

/// One structured call against an external service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    pub id: DescriptorId,
    pub target_service: ServiceKind,
    pub operation: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub expected_response_shape: ResponseShape,
    /// Earlier descriptors whose responses feed placeholders here
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DescriptorId>,
    /// Ontology id of the frame entity this call is about
    pub subject: String,
}

impl QueryDescriptor {
    pub fn placeholders(&self) -> impl Iterator<Item = (&str, DescriptorId, &str)> {
        self.parameters.iter().filter_map(|(name, value)| match value {
            ParamValue::Ref { descriptor, field } => Some((name.as_str(), *descriptor, field.as_str())),
            ParamValue::Literal(_) => None,
        })
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.target_service, self.operation)
    }
}

/// A compiled frame: the descriptors in dependency order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub frame: SemanticFrame,
    pub descriptors: Vec<QueryDescriptor>,
    /// Follow-up questions derived from the frame and the ontology
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl QueryPlan {
    /// Dependency level of every descriptor (0 for independent ones)
    pub fn levels(&self) -> Vec<usize> {
        let mut levels = vec![0usize; self.descriptors.len()];
        for (i, descriptor) in self.descriptors.iter().enumerate() {
            levels[i] = descriptor
                .depends_on
                .iter()
                .filter(|dep| dep.index() < i)
                .map(|dep| levels[dep.index()] + 1)
                .max()
                .unwrap_or(0);
        }
        levels
    }

    /// Descriptors no other descriptor depends on
    pub fn terminal_ids(&self) -> Vec<DescriptorId> {
        self.descriptors
            .iter()
            .filter(|d| {
                !self
                    .descriptors
                    .iter()
                    .any(|other| other.depends_on.contains(&d.id))
            })
            .map(|d| d.id)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_rendering() {
        let value = ParamValue::reference(DescriptorId(0), "taxon_id");
        assert_eq!(value.to_string(), "${d0.taxon_id}");
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"${d0.taxon_id}\"");
        assert_eq!(ParamValue::literal("taxonomy").to_string(), "taxonomy");
    }

    #[test]
    fn test_service_names() {
        assert_eq!(serde_json::to_string(&ServiceKind::QuickGo).unwrap(), "\"quickgo\"");
        assert_eq!(serde_json::to_string(&ServiceKind::StringDb).unwrap(), "\"string_db\"");
        assert_eq!(ServiceKind::StringDb.to_string(), "string_db");
        assert_eq!(serde_json::from_str::<ServiceKind>("\"reactome\"").unwrap(), ServiceKind::Reactome);
    }
}
