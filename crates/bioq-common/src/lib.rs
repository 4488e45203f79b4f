//! BioQ Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the BioQ workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all BioQ workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Checksums**: Content digests used for provenance records
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Types**: Shared value types
//!
//! # Example
//!
//! ```no_run
//! use bioq_common::{Result, checksum::digest_json};
//!
//! fn fingerprint(payload: &serde_json::Value) -> Result<()> {
//!     let digest = digest_json(payload)?;
//!     tracing::info!(%digest, "payload fingerprint");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{BioqError, Result};
pub use types::{ChecksumAlgorithm, ContentDigest};
