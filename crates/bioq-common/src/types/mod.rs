//! Common types used across BioQ

use crate::error::BioqError;
use serde::{Deserialize, Serialize};

/// Checksum algorithm type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl std::str::FromStr for ChecksumAlgorithm {
    type Err = BioqError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            other => Err(BioqError::InvalidDigest(format!("unknown algorithm '{}'", other))),
        }
    }
}

/// A content digest rendered as `algorithm:hex` (e.g. `sha256:b94d27...`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentDigest {
    pub algorithm: ChecksumAlgorithm,
    pub hex: String,
}

impl ContentDigest {
    pub fn new(algorithm: ChecksumAlgorithm, hex: impl Into<String>) -> Self {
        Self {
            algorithm,
            hex: hex.into(),
        }
    }

    /// First `len` hex characters, for compact display
    pub fn short(&self, len: usize) -> &str {
        &self.hex[..len.min(self.hex.len())]
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl std::str::FromStr for ContentDigest {
    type Err = BioqError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| BioqError::InvalidDigest(format!("missing algorithm prefix in '{}'", s)))?;

        let algorithm: ChecksumAlgorithm = algorithm.parse()?;
        let expected_len = match algorithm {
            ChecksumAlgorithm::Sha256 => 64,
        };

        if hex.len() != expected_len || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BioqError::InvalidDigest(format!(
                "expected {} hex characters for {}, got '{}'",
                expected_len, algorithm, hex
            )));
        }

        Ok(Self::new(algorithm, hex.to_lowercase()))
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.to_string()
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = BioqError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}
