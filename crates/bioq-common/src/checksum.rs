//! Checksum utilities for content fingerprints
//!
//! Provenance records carry a digest of every raw service response so a
//! result can be checked against the exact bytes that produced it. JSON
//! payloads are digested in a canonical form (object keys sorted at every
//! depth, no insignificant whitespace) so the digest does not depend on the
//! key order a client happened to produce.

use crate::error::Result;
use crate::types::{ChecksumAlgorithm, ContentDigest};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 digest of a byte slice
pub fn digest_bytes(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentDigest::new(ChecksumAlgorithm::Sha256, hex::encode(hasher.finalize()))
}

/// SHA-256 digest of a JSON value in canonical form
pub fn digest_json(value: &Value) -> Result<ContentDigest> {
    let canonical = canonical_json(value)?;
    Ok(digest_bytes(canonical.as_bytes()))
}

/// Render a JSON value with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                if let Some(inner) = map.get(key.as_str()) {
                    write_canonical(inner, out)?;
                }
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        },
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }

    Ok(())
}
