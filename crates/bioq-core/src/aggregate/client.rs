//! External service client collaborator

use crate::model::ServiceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A concrete call: a descriptor with every placeholder substituted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub service: ServiceKind,
    pub operation: String,
    pub parameters: BTreeMap<String, String>,
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service, self.operation)?;
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        if !params.is_empty() {
            write!(f, "?{}", params.join("&"))?;
        }
        Ok(())
    }
}

/// Failure a client reports for one call
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceFailure {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found")]
    NotFound,

    #[error("malformed response: {detail}")]
    Malformed { detail: String },

    #[error("service unavailable: {detail}")]
    Unavailable { detail: String },
}

impl ServiceFailure {
    pub fn malformed(detail: impl Into<String>) -> Self {
        ServiceFailure::Malformed {
            detail: detail.into(),
        }
    }
}

/// Executes calls against external data services
///
/// Implementations own connection handling, retries and rate limiting; the
/// aggregator issues each call at most once and reports whatever comes back.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn execute(&self, call: &ServiceCall) -> Result<Value, ServiceFailure>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_wire_format() {
        let failure = ServiceFailure::RateLimited { retry_after_secs: 3 };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "rate_limited", "retry_after_secs": 3}));

        let parsed: ServiceFailure = serde_json::from_str(r#"{"kind": "timeout"}"#).unwrap();
        assert_eq!(parsed, ServiceFailure::Timeout);
        assert_eq!(parsed.to_string(), "request timed out");
    }

    #[test]
    fn test_call_display() {
        let call = ServiceCall {
            service: ServiceKind::Entrez,
            operation: "taxonomy_search".to_string(),
            parameters: BTreeMap::from([
                ("db".to_string(), "taxonomy".to_string()),
                ("term".to_string(), "Mus musculus".to_string()),
            ]),
        };
        assert_eq!(call.to_string(), "entrez/taxonomy_search?db=taxonomy&term=Mus musculus");
    }
}
