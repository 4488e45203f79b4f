//! Result aggregation
//!
//! [`Aggregator::aggregate`] executes a compiled [`QueryPlan`] through a
//! [`ServiceClient`]. Descriptors run level by level: every descriptor whose
//! dependencies are recorded is dispatched in the same wave, and the next
//! wave starts only after the current one has finished. Provenance and facts
//! are always assembled in compile order, independent of completion order.

mod client;
mod normalize;
mod replay;

pub use client::{ServiceCall, ServiceClient, ServiceFailure};
pub use replay::{FixtureError, ReplayClient, ReplayEntry};

use crate::error::QueryError;
use crate::model::{
    CallOutcome, DescriptorId, EntityFacts, Fact, ParamValue, Payload, ProvenanceEntry,
    QueryDescriptor, QueryPlan, ResolvedResult, ResultStatus, SemanticFrame,
};
use bioq_common::checksum::digest_json;
use futures::future::join_all;
use normalize::{normalize_response, Normalized};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Execution state of one descriptor
#[derive(Debug, Default)]
struct CallRecord {
    call: Option<ServiceCall>,
    outcome: Option<CallOutcome>,
    normalized: Option<Normalized>,
}

impl CallRecord {
    fn succeeded(&self) -> bool {
        self.outcome.as_ref().is_some_and(CallOutcome::is_success)
    }

    fn failed(&self) -> bool {
        !self.succeeded()
    }
}

pub struct Aggregator {
    client: Arc<dyn ServiceClient>,
}

impl Aggregator {
    pub fn new(client: Arc<dyn ServiceClient>) -> Self {
        Self { client }
    }

    /// Execute `plan` and assemble the final result
    ///
    /// Returns `QueryError::Cancelled` if `cancel` fires before the last wave
    /// completes; no partial result is produced for a cancelled query.
    #[instrument(skip_all, fields(intent = %plan.frame.intent, descriptors = plan.descriptors.len()))]
    pub async fn aggregate(
        &self,
        plan: QueryPlan,
        cancel: &CancellationToken,
    ) -> Result<ResolvedResult, QueryError> {
        let levels = plan.levels();
        let max_level = levels.iter().copied().max().unwrap_or(0);
        let referenced = referenced_fields(&plan.descriptors);
        let mut records: Vec<CallRecord> =
            plan.descriptors.iter().map(|_| CallRecord::default()).collect();

        for level in 0..=max_level {
            if cancel.is_cancelled() {
                return Err(QueryError::Cancelled);
            }

            let mut wave: Vec<(usize, ServiceCall)> = Vec::new();
            for (index, descriptor) in plan.descriptors.iter().enumerate() {
                if levels[index] != level {
                    continue;
                }
                if let Some(dep) = descriptor
                    .depends_on
                    .iter()
                    .find(|dep| records.get(dep.index()).map(CallRecord::failed).unwrap_or(true))
                {
                    records[index].outcome = Some(CallOutcome::Skipped {
                        reason: format!("dependency {} did not succeed", dep),
                    });
                    continue;
                }
                match substitute(descriptor, &records) {
                    Ok(call) => wave.push((index, call)),
                    Err(reason) => {
                        records[index].outcome = Some(CallOutcome::Skipped { reason });
                    },
                }
            }

            if wave.is_empty() {
                continue;
            }
            debug!(level, calls = wave.len(), "dispatching wave");

            let responses = {
                let calls = wave.iter().map(|(_, call)| self.client.execute(call));
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!(level, "query cancelled with calls in flight");
                        return Err(QueryError::Cancelled);
                    }
                    responses = join_all(calls) => responses,
                }
            };

            for ((index, call), response) in wave.into_iter().zip(responses) {
                let descriptor = &plan.descriptors[index];
                let record = &mut records[index];
                record.outcome = Some(match response {
                    Ok(value) => match validate(descriptor, &call, &value, &referenced) {
                        Ok((digest, normalized)) => {
                            debug!(descriptor = %descriptor.id, facts = normalized.facts.len(), "call succeeded");
                            record.normalized = Some(normalized);
                            CallOutcome::Succeeded { digest }
                        },
                        Err(failure) => {
                            warn!(descriptor = %descriptor.id, %failure, "response rejected");
                            CallOutcome::Failed { failure }
                        },
                    },
                    Err(failure) => {
                        warn!(descriptor = %descriptor.id, call = %call, %failure, "call failed");
                        CallOutcome::Failed { failure }
                    },
                });
                record.call = Some(call);
            }
        }

        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let (status, failed_descriptor) = decide_status(&plan, &records);
        let payload = if status == ResultStatus::Failed {
            Payload::default()
        } else {
            build_payload(&plan.frame, &plan.descriptors, &records)
        };

        let provenance = plan
            .descriptors
            .into_iter()
            .zip(records)
            .map(|(descriptor, record)| ProvenanceEntry {
                outcome: record.outcome.unwrap_or_else(|| CallOutcome::Skipped {
                    reason: "not dispatched".to_string(),
                }),
                call: record.call,
                descriptor,
            })
            .collect();

        info!(
            %status,
            facts = payload.fact_count(),
            failed_descriptor = ?failed_descriptor,
            "aggregation finished"
        );

        let snapshot_version = plan.frame.snapshot_version.clone();
        Ok(ResolvedResult {
            status,
            payload,
            provenance,
            failed_descriptor,
            frame: plan.frame,
            suggestions: plan.suggestions,
            snapshot_version,
        })
    }
}

/// Output fields each descriptor must expose for later placeholders
fn referenced_fields(descriptors: &[QueryDescriptor]) -> BTreeMap<DescriptorId, Vec<String>> {
    let mut fields: BTreeMap<DescriptorId, Vec<String>> = BTreeMap::new();
    for descriptor in descriptors {
        for (_, dep, field) in descriptor.placeholders() {
            let entry = fields.entry(dep).or_default();
            if !entry.iter().any(|f| f == field) {
                entry.push(field.to_string());
            }
        }
    }
    fields
}

/// Replace placeholders with values recorded from earlier responses
fn substitute(descriptor: &QueryDescriptor, records: &[CallRecord]) -> Result<ServiceCall, String> {
    let mut parameters = BTreeMap::new();
    for (name, value) in &descriptor.parameters {
        let resolved = match value {
            ParamValue::Literal(value) => value.clone(),
            ParamValue::Ref { descriptor: dep, field } => records
                .get(dep.index())
                .and_then(|record| record.normalized.as_ref())
                .and_then(|normalized| normalized.outputs.get(field))
                .cloned()
                .ok_or_else(|| format!("{} produced no '{}'", dep, field))?,
        };
        parameters.insert(name.clone(), resolved);
    }
    Ok(ServiceCall {
        service: descriptor.target_service,
        operation: descriptor.operation.clone(),
        parameters,
    })
}

fn validate(
    descriptor: &QueryDescriptor,
    call: &ServiceCall,
    value: &serde_json::Value,
    referenced: &BTreeMap<DescriptorId, Vec<String>>,
) -> Result<(bioq_common::ContentDigest, Normalized), ServiceFailure> {
    let normalized = normalize_response(descriptor.expected_response_shape, call, value)?;

    if let Some(missing) = referenced
        .get(&descriptor.id)
        .into_iter()
        .flatten()
        .find(|field| !normalized.outputs.contains_key(*field))
    {
        return Err(ServiceFailure::malformed(format!(
            "{} response has no '{}'",
            descriptor.expected_response_shape, missing
        )));
    }

    let digest = digest_json(value).map_err(|e| ServiceFailure::malformed(e.to_string()))?;
    Ok((digest, normalized))
}

/// A failed dependency fails the query; otherwise terminal descriptors
/// decide between ok, partial and failed
fn decide_status(plan: &QueryPlan, records: &[CallRecord]) -> (ResultStatus, Option<DescriptorId>) {
    let has_dependents = |id: DescriptorId| {
        plan.descriptors
            .iter()
            .any(|other| other.depends_on.contains(&id))
    };

    let failed_dependency = plan.descriptors.iter().find(|d| {
        has_dependents(d.id)
            && records[d.id.index()]
                .outcome
                .as_ref()
                .is_some_and(|outcome| matches!(outcome, CallOutcome::Failed { .. }))
    });
    if let Some(descriptor) = failed_dependency {
        return (ResultStatus::Failed, Some(descriptor.id));
    }

    let terminals = plan.terminal_ids();
    let succeeded = terminals
        .iter()
        .filter(|id| records[id.index()].succeeded())
        .count();

    let status = if succeeded == terminals.len() {
        ResultStatus::Ok
    } else if succeeded > 0 {
        ResultStatus::Partial
    } else {
        let first_failed = terminals
            .iter()
            .copied()
            .find(|id| records[id.index()].failed());
        return (ResultStatus::Failed, first_failed);
    };

    if status == ResultStatus::Ok && plan.frame.is_ambiguous() {
        return (ResultStatus::Partial, None);
    }
    (status, None)
}

fn build_payload(
    frame: &SemanticFrame,
    descriptors: &[QueryDescriptor],
    records: &[CallRecord],
) -> Payload {
    let mut payload = Payload::default();
    for (descriptor, record) in descriptors.iter().zip(records) {
        let Some(normalized) = record.normalized.as_ref().filter(|_| record.succeeded()) else {
            continue;
        };
        let group = payload
            .entities
            .entry(descriptor.subject.clone())
            .or_insert_with(|| EntityFacts {
                display_name: display_name(frame, &descriptor.subject),
                facts: Vec::new(),
            });
        group
            .facts
            .extend(normalized.facts.iter().map(|(kind, data)| Fact {
                kind: kind.clone(),
                data: data.clone(),
                source: descriptor.id,
            }));
    }
    payload
}

fn display_name(frame: &SemanticFrame, ontology_id: &str) -> String {
    frame
        .find_entity(ontology_id)
        .map(|entity| entity.display_name.clone())
        .or_else(|| {
            frame
                .slots
                .values()
                .filter_map(|fill| fill.value.entity())
                .find(|entity| entity.ontology_id == ontology_id)
                .map(|entity| entity.display_name.clone())
        })
        .unwrap_or_else(|| ontology_id.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{FrameStatus, IntentKind, ResponseShape, ServiceKind};
    use crate::ontology::SnapshotVersion;
    use async_trait::async_trait;
    use bioq_common::checksum::digest_bytes;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers by operation name, optionally after a delay
    struct ScriptedClient {
        answers: BTreeMap<String, (u64, Result<Value, ServiceFailure>)>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(answers: Vec<(&str, u64, Result<Value, ServiceFailure>)>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|(op, delay, answer)| (op.to_string(), (delay, answer)))
                    .collect(),
                log: Mutex::new(Vec::new()),
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ServiceClient for ScriptedClient {
        async fn execute(&self, call: &ServiceCall) -> Result<Value, ServiceFailure> {
            let (delay, answer) = self.answers.get(&call.operation).cloned().unwrap();
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.log.lock().unwrap().push(call.operation.clone());
            answer
        }
    }

    fn frame() -> SemanticFrame {
        SemanticFrame {
            intent: IntentKind::Comparison,
            slots: BTreeMap::new(),
            status: FrameStatus::Complete,
            text: String::new(),
            spans: Vec::new(),
            ranked_intents: Vec::new(),
            attempted_intents: vec![IntentKind::Comparison],
            entities: Vec::new(),
            unresolved: Vec::new(),
            snapshot_version: SnapshotVersion {
                label: "test".to_string(),
                digest: digest_bytes(b"test"),
            },
        }
    }

    fn descriptor(
        id: u16,
        operation: &str,
        shape: ResponseShape,
        parameters: Vec<(&str, ParamValue)>,
    ) -> QueryDescriptor {
        let parameters: BTreeMap<String, ParamValue> = parameters
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let depends_on = parameters
            .values()
            .filter_map(|v| match v {
                ParamValue::Ref { descriptor, .. } => Some(*descriptor),
                ParamValue::Literal(_) => None,
            })
            .collect();
        QueryDescriptor {
            id: DescriptorId(id),
            target_service: ServiceKind::Entrez,
            operation: operation.to_string(),
            parameters,
            expected_response_shape: shape,
            depends_on,
            subject: format!("NCBIGene:{}", id),
        }
    }

    fn gene_summary(uid: &str, name: &str) -> Value {
        let mut result = serde_json::Map::new();
        result.insert("uids".to_string(), json!([uid]));
        result.insert(uid.to_string(), json!({ "name": name }));
        json!({ "result": result })
    }

    fn fan_out() -> QueryPlan {
        QueryPlan {
            frame: frame(),
            descriptors: vec![
                descriptor(0, "slow", ResponseShape::GeneSummary, vec![]),
                descriptor(1, "fast", ResponseShape::GeneSummary, vec![]),
            ],
            suggestions: Vec::new(),
        }
    }

    fn dependent() -> QueryPlan {
        QueryPlan {
            frame: frame(),
            descriptors: vec![
                descriptor(0, "taxonomy_search", ResponseShape::TaxonRecord, vec![]),
                descriptor(
                    1,
                    "homology_symbol",
                    ResponseShape::HomologyGroups,
                    vec![("target_taxon", ParamValue::reference(DescriptorId(0), "taxon_id"))],
                ),
            ],
            suggestions: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_provenance_follows_compile_order() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("slow", 50, Ok(gene_summary("7157", "TP53"))),
            ("fast", 1, Ok(gene_summary("672", "BRCA1"))),
        ]));
        let result = Aggregator::new(client.clone())
            .aggregate(fan_out(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(client.log(), vec!["fast", "slow"]);
        assert_eq!(result.status, ResultStatus::Ok);
        let order: Vec<u16> = result.provenance.iter().map(|p| p.descriptor.id.0).collect();
        assert_eq!(order, vec![0, 1]);
        assert!(result.payload.facts().all(|(_, fact)| result.provenance_for(fact.source).is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fan_out_member_is_partial() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("slow", 5, Ok(gene_summary("7157", "TP53"))),
            ("fast", 1, Err(ServiceFailure::NotFound)),
        ]));
        let result = Aggregator::new(client)
            .aggregate(fan_out(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Partial);
        assert_eq!(result.payload.fact_count(), 1);
        assert!(matches!(
            result.provenance[1].outcome,
            CallOutcome::Failed { failure: ServiceFailure::NotFound }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_substituted_from_dependency() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("taxonomy_search", 1, Ok(json!({"esearchresult": {"idlist": ["10090"]}}))),
            ("homology_symbol", 1, Ok(json!({"data": []}))),
        ]));
        let result = Aggregator::new(client)
            .aggregate(dependent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Ok);
        let call = result.provenance[1].call.as_ref().unwrap();
        assert_eq!(call.parameters["target_taxon"], "10090");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_dependency_skips_dependent() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("taxonomy_search", 1, Err(ServiceFailure::Timeout)),
            ("homology_symbol", 1, Ok(json!({"data": []}))),
        ]));
        let result = Aggregator::new(client.clone())
            .aggregate(dependent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Failed);
        assert_eq!(result.failed_descriptor, Some(DescriptorId(0)));
        assert_eq!(client.log(), vec!["taxonomy_search"]);
        assert!(result.provenance[1].call.is_none());
        assert!(matches!(result.provenance[1].outcome, CallOutcome::Skipped { .. }));
        assert!(result.payload.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_output_field_marks_dependency_malformed() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("taxonomy_search", 1, Ok(json!({"esearchresult": {"idlist": []}}))),
            ("homology_symbol", 1, Ok(json!({"data": []}))),
        ]));
        let result = Aggregator::new(client)
            .aggregate(dependent(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Failed);
        assert!(matches!(
            result.provenance[0].outcome,
            CallOutcome::Failed { failure: ServiceFailure::Malformed { .. } }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_yields_no_result() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("slow", 1_000, Ok(gene_summary("7157", "TP53"))),
            ("fast", 1_000, Ok(gene_summary("672", "BRCA1"))),
        ]));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = Aggregator::new(client)
            .aggregate(fan_out(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
    }
}
