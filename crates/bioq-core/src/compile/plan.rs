use crate::model::{DescriptorId, ParamValue, QueryDescriptor, ResponseShape, ServiceKind};
use std::collections::BTreeMap;

/// Accumulates descriptors in emission order and derives `depends_on`
/// from placeholder parameters
#[derive(Debug, Default)]
pub(crate) struct PlanBuilder {
    descriptors: Vec<QueryDescriptor>,
}

impl PlanBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn call(
        &mut self,
        service: ServiceKind,
        operation: &str,
        shape: ResponseShape,
        subject: &str,
    ) -> DescriptorDraft<'_> {
        DescriptorDraft {
            builder: self,
            service,
            operation: operation.to_string(),
            shape,
            subject: subject.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    pub(crate) fn finish(self) -> Vec<QueryDescriptor> {
        self.descriptors
    }
}

pub(crate) struct DescriptorDraft<'b> {
    builder: &'b mut PlanBuilder,
    service: ServiceKind,
    operation: String,
    shape: ResponseShape,
    subject: String,
    parameters: BTreeMap<String, ParamValue>,
}

impl DescriptorDraft<'_> {
    pub(crate) fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters
            .insert(name.to_string(), ParamValue::literal(value));
        self
    }

    pub(crate) fn param_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Placeholder filled from `field` of an earlier descriptor's response
    pub(crate) fn param_ref(mut self, name: &str, descriptor: DescriptorId, field: &str) -> Self {
        self.parameters
            .insert(name.to_string(), ParamValue::reference(descriptor, field));
        self
    }

    pub(crate) fn push(self) -> DescriptorId {
        let id = DescriptorId(self.builder.descriptors.len() as u16);

        let mut depends_on: Vec<DescriptorId> = self
            .parameters
            .values()
            .filter_map(|value| match value {
                ParamValue::Ref { descriptor, .. } => Some(*descriptor),
                ParamValue::Literal(_) => None,
            })
            .collect();
        depends_on.sort();
        depends_on.dedup();
        debug_assert!(depends_on.iter().all(|dep| *dep < id));

        self.builder.descriptors.push(QueryDescriptor {
            id,
            target_service: self.service,
            operation: self.operation,
            parameters: self.parameters,
            expected_response_shape: self.shape,
            depends_on,
            subject: self.subject,
        });
        id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_depends_on_derived_from_refs() {
        let mut plan = PlanBuilder::new();
        let taxon = plan
            .call(ServiceKind::Entrez, "taxonomy_search", ResponseShape::TaxonRecord, "NCBITaxon:10090")
            .param("db", "taxonomy")
            .param("term", "Mus musculus")
            .push();
        plan.call(ServiceKind::Ensembl, "homology_symbol", ResponseShape::HomologyGroups, "NCBIGene:7157")
            .param("symbol", "TP53")
            .param_ref("target_taxon", taxon, "taxon_id")
            .param_opt("type", None::<String>)
            .push();

        let descriptors = plan.finish();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors[0].depends_on.is_empty());
        assert_eq!(descriptors[1].depends_on, vec![DescriptorId(0)]);
        assert_eq!(descriptors[1].parameters["target_taxon"].to_string(), "${d0.taxon_id}");
        assert!(!descriptors[1].parameters.contains_key("type"));
    }
}
