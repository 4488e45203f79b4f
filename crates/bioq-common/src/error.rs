//! Error types for BioQ

use thiserror::Error;

/// Result type alias for BioQ common operations
pub type Result<T> = std::result::Result<T, BioqError>;

/// Main error type for BioQ common utilities
#[derive(Error, Debug)]
pub enum BioqError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),
}
