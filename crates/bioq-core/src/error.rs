//! Error types for the resolution engine
//!
//! Extraction, resolution and compilation failures abort a query before any
//! external call is made. Service failures are usually reported inside a
//! [`ResolvedResult`](crate::ResolvedResult) instead; [`ExternalServiceError`]
//! is what a `failed` result becomes through `into_outcome`.

use crate::aggregate::ServiceFailure;
use crate::model::{
    AlternativeCandidate, DescriptorId, EntitySpan, IntentKind, SemanticFrame, ServiceKind,
    SlotName,
};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating an ontology snapshot
#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("failed to read ontology snapshot '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ontology snapshot: {0}")]
    Parse(String),

    #[error("unsupported snapshot format for '{}' (expected .json, .yaml or .yml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("record '{id}' has no recognised ontology prefix")]
    UnknownPrefix { id: String },

    #[error("record '{id}' is declared as {declared} but its prefix belongs to {expected}")]
    SourceMismatch {
        id: String,
        declared: String,
        expected: String,
    },

    #[error("record '{from}' lists {relation} '{to}' which is not in the snapshot")]
    DanglingEdge {
        from: String,
        to: String,
        relation: &'static str,
    },

    #[error("snapshot contains no records for the active sources")]
    EmptySnapshot,

    #[error("invalid snapshot: {0}")]
    Invalid(String),

    #[error(transparent)]
    Digest(#[from] bioq_common::BioqError),
}

/// Errors raised while loading or validating engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// A client-reported failure and the descriptor it belongs to
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{service}/{operation} ({descriptor}) failed: {failure}")]
pub struct ExternalServiceError {
    pub descriptor: DescriptorId,
    pub service: ServiceKind,
    pub operation: String,
    pub failure: ServiceFailure,
}

/// Terminal errors for one query
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("query is empty after normalization")]
    EmptyInput,

    #[error("no ontology match for {span}{}", .best_score.map(|s| format!(" (best score {:.2})", s)).unwrap_or_default())]
    UnresolvedEntity {
        span: EntitySpan,
        best_score: Option<f64>,
    },

    #[error("cannot fill {intent} query: missing slots [{}]", join_slots(.missing))]
    IncompleteFrame {
        intent: IntentKind,
        missing: Vec<SlotName>,
        attempted: Vec<IntentKind>,
        frame: Box<SemanticFrame>,
    },

    #[error("no compilation rule for {intent} query: {reason}")]
    UnsupportedIntent { intent: IntentKind, reason: String },

    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),

    #[error("{span} is ambiguous between {}", join_candidates(.candidates))]
    AmbiguousResolution {
        span: EntitySpan,
        candidates: Vec<AlternativeCandidate>,
    },

    #[error("query was cancelled")]
    Cancelled,

    #[error(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn join_slots(slots: &[SlotName]) -> String {
    slots
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_candidates(candidates: &[AlternativeCandidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{} ({:.2})", c.ontology_id, c.confidence))
        .collect::<Vec<_>>()
        .join(", ")
}

impl QueryError {
    /// Stable machine-readable code for the error class
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::EmptyInput => "empty_input",
            QueryError::UnresolvedEntity { .. } => "unresolved_entity",
            QueryError::IncompleteFrame { .. } => "incomplete_frame",
            QueryError::UnsupportedIntent { .. } => "unsupported_intent",
            QueryError::ExternalService(_) => "external_service",
            QueryError::AmbiguousResolution { .. } => "ambiguous_resolution",
            QueryError::Cancelled => "cancelled",
            QueryError::Ontology(_) => "ontology",
            QueryError::Config(_) => "config",
        }
    }
}
