use super::descriptor::{DescriptorId, QueryDescriptor};
use super::frame::SemanticFrame;
use crate::aggregate::{ServiceCall, ServiceFailure};
use crate::error::{ExternalServiceError, QueryError};
use crate::ontology::SnapshotVersion;
use bioq_common::ContentDigest;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Partial,
    Failed,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Ok => write!(f, "ok"),
            ResultStatus::Partial => write!(f, "partial"),
            ResultStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What happened to one descriptor during execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Succeeded { digest: ContentDigest },
    Failed { failure: ServiceFailure },
    Skipped { reason: String },
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Succeeded { .. })
    }
}

/// Provenance for one descriptor, in compile order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvenanceEntry {
    pub descriptor: QueryDescriptor,
    /// The call actually issued, placeholders substituted; `None` if never dispatched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<ServiceCall>,
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

/// One normalized piece of data and the descriptor that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub kind: String,
    pub data: Value,
    pub source: DescriptorId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFacts {
    pub display_name: String,
    pub facts: Vec<Fact>,
}

/// Normalized results keyed by the frame entity they describe
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload {
    pub entities: BTreeMap<String, EntityFacts>,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.entities.values().all(|e| e.facts.is_empty())
    }

    pub fn facts(&self) -> impl Iterator<Item = (&str, &Fact)> {
        self.entities
            .iter()
            .flat_map(|(id, group)| group.facts.iter().map(move |fact| (id.as_str(), fact)))
    }

    pub fn fact_count(&self) -> usize {
        self.entities.values().map(|e| e.facts.len()).sum()
    }
}

/// The final, immutable answer to a question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedResult {
    pub status: ResultStatus,
    pub payload: Payload,
    pub provenance: Vec<ProvenanceEntry>,
    /// Descriptor whose failure decided a `failed` status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_descriptor: Option<DescriptorId>,
    pub frame: SemanticFrame,
    /// Follow-up questions carried over from the plan
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub snapshot_version: SnapshotVersion,
}

impl ResolvedResult {
    pub fn provenance_for(&self, id: DescriptorId) -> Option<&ProvenanceEntry> {
        self.provenance.iter().find(|entry| entry.descriptor.id == id)
    }

    /// Convert a `failed` result into the typed error, for callers that
    /// want a plain `Result`
    pub fn into_outcome(self) -> Result<ResolvedResult, QueryError> {
        if self.status != ResultStatus::Failed {
            return Ok(self);
        }

        let failing = self
            .failed_descriptor
            .and_then(|id| self.provenance_for(id))
            .or_else(|| {
                self.provenance
                    .iter()
                    .find(|entry| matches!(entry.outcome, CallOutcome::Failed { .. }))
            });

        match failing {
            Some(entry) => {
                let failure = match &entry.outcome {
                    CallOutcome::Failed { failure } => failure.clone(),
                    other => ServiceFailure::Unavailable {
                        detail: format!("descriptor ended as {:?}", other),
                    },
                };
                Err(QueryError::ExternalService(ExternalServiceError {
                    descriptor: entry.descriptor.id,
                    service: entry.descriptor.target_service,
                    operation: entry.descriptor.operation.clone(),
                    failure,
                }))
            },
            None => Ok(self),
        }
    }
}
