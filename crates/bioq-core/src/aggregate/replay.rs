//! Offline service client backed by recorded responses

use super::client::{ServiceCall, ServiceClient, ServiceFailure};
use crate::model::ServiceKind;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read response fixture '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid response fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid response fixture entry {index}: {message}")]
    Invalid { index: usize, message: String },
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureFile {
    responses: Vec<ReplayEntry>,
}

/// One recorded exchange. `parameters` only needs to be a subset of the
/// call's parameters for the entry to match.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayEntry {
    pub service: ServiceKind,
    pub operation: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub failure: Option<ServiceFailure>,
    /// Simulated latency before answering
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl ReplayEntry {
    fn matches(&self, call: &ServiceCall) -> bool {
        self.service == call.service
            && self.operation == call.operation
            && self
                .parameters
                .iter()
                .all(|(name, value)| call.parameters.get(name) == Some(value))
    }
}

/// Answers calls from a fixture; the most specific matching entry wins,
/// then the earliest in the file
#[derive(Debug)]
pub struct ReplayClient {
    entries: Vec<ReplayEntry>,
    dispatched: Mutex<Vec<ServiceCall>>,
}

impl ReplayClient {
    pub fn new(entries: Vec<ReplayEntry>) -> Result<Self, FixtureError> {
        for (index, entry) in entries.iter().enumerate() {
            if entry.response.is_some() == entry.failure.is_some() {
                return Err(FixtureError::Invalid {
                    index,
                    message: "exactly one of 'response' or 'failure' is required".to_string(),
                });
            }
        }
        Ok(Self {
            entries,
            dispatched: Mutex::new(Vec::new()),
        })
    }

    pub fn from_json(content: &str) -> Result<Self, FixtureError> {
        let file: FixtureFile = serde_json::from_str(content)?;
        Self::new(file.responses)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Calls received so far, in arrival order
    pub fn dispatched(&self) -> Vec<ServiceCall> {
        match self.dispatched.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, call: &ServiceCall) -> Option<&ReplayEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.matches(call))
            .max_by(|(ia, a), (ib, b)| {
                a.parameters
                    .len()
                    .cmp(&b.parameters.len())
                    .then_with(|| ib.cmp(ia))
            })
            .map(|(_, entry)| entry)
    }
}

#[async_trait]
impl ServiceClient for ReplayClient {
    async fn execute(&self, call: &ServiceCall) -> Result<Value, ServiceFailure> {
        match self.dispatched.lock() {
            Ok(mut calls) => calls.push(call.clone()),
            Err(poisoned) => poisoned.into_inner().push(call.clone()),
        }

        let Some(entry) = self.find(call) else {
            warn!(%call, "no recorded response");
            return Err(ServiceFailure::Unavailable {
                detail: format!("no recorded response for {}", call),
            });
        };

        if let Some(delay) = entry.delay_ms {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        debug!(%call, failed = entry.failure.is_some(), "replaying recorded response");
        match (&entry.response, &entry.failure) {
            (_, Some(failure)) => Err(failure.clone()),
            (Some(response), None) => Ok(response.clone()),
            (None, None) => Err(ServiceFailure::Unavailable {
                detail: "empty fixture entry".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "responses": [
            {"service": "entrez", "operation": "gene_summary", "response": {"generic": true}},
            {"service": "entrez", "operation": "gene_summary", "parameters": {"id": "7157"}, "response": {"specific": true}},
            {"service": "entrez", "operation": "taxonomy_search", "failure": {"kind": "timeout"}}
        ]
    }"#;

    fn call(operation: &str, params: &[(&str, &str)]) -> ServiceCall {
        ServiceCall {
            service: ServiceKind::Entrez,
            operation: operation.to_string(),
            parameters: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_most_specific_entry_wins() {
        let client = ReplayClient::from_json(FIXTURE).unwrap();
        let specific = client
            .execute(&call("gene_summary", &[("db", "gene"), ("id", "7157")]))
            .await
            .unwrap();
        assert_eq!(specific, serde_json::json!({"specific": true}));

        let generic = client
            .execute(&call("gene_summary", &[("db", "gene"), ("id", "672")]))
            .await
            .unwrap();
        assert_eq!(generic, serde_json::json!({"generic": true}));
        assert_eq!(client.dispatched().len(), 2);
    }

    #[tokio::test]
    async fn test_recorded_failure_and_missing_entry() {
        let client = ReplayClient::from_json(FIXTURE).unwrap();
        let err = client.execute(&call("taxonomy_search", &[])).await.unwrap_err();
        assert_eq!(err, ServiceFailure::Timeout);

        let err = client.execute(&call("esearch", &[])).await.unwrap_err();
        assert!(matches!(err, ServiceFailure::Unavailable { .. }));
    }

    #[test]
    fn test_entry_needs_response_or_failure() {
        let err = ReplayClient::from_json(
            r#"{"responses": [{"service": "ensembl", "operation": "lookup_symbol"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FixtureError::Invalid { index: 0, .. }));
    }
}
