//! Error types for BioQ CLI
//!
//! Every variant renders as a complete sentence with a hint on how to fix it.

use bioq_core::evaluation::BenchmarkError;
use bioq_core::aggregate::FixtureError;
use bioq_core::{ConfigError, OntologyError, QueryError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// User-facing CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    /// No ontology snapshot was given
    #[error("No ontology snapshot configured. Pass --ontology <FILE> or set BIOQ_ONTOLOGY.")]
    MissingOntology,

    /// `answer` needs recorded responses to replay
    #[error("No recorded responses configured. Pass --responses <FILE> or set BIOQ_RESPONSES.")]
    MissingResponses,

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// Snapshot failed to load or validate
    #[error("Ontology error: {0}. Check the snapshot file against the documented record format.")]
    Ontology(#[from] OntologyError),

    /// Engine configuration is invalid
    #[error("Configuration error: {0}. Run 'bioq config show' to inspect the effective settings.")]
    Config(#[from] ConfigError),

    /// Recorded response file is unreadable or invalid
    #[error("Response fixture error: {0}.")]
    Fixture(#[from] FixtureError),

    /// Benchmark case file is unreadable or invalid
    #[error("Benchmark error: {0}.")]
    Benchmark(#[from] BenchmarkError),

    /// The engine rejected the question
    #[error("{0}")]
    Query(#[from] QueryError),

    /// The question was answered but every terminal call failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Unknown value for a CLI option
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON rendering failed
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_remediation() {
        assert!(CliError::MissingOntology.to_string().contains("BIOQ_ONTOLOGY"));
        assert!(CliError::MissingResponses.to_string().contains("--responses"));
        assert!(CliError::file_not_found("x.json").to_string().contains("'x.json'"));
    }

    #[test]
    fn test_query_error_passes_through() {
        let err = CliError::from(QueryError::EmptyInput);
        assert_eq!(err.to_string(), "query is empty after normalization");
    }
}
