//! Checksums for model layout fingerprints

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a JSON value's compact serialization
    pub fn from_json(value: &serde_json::Value) -> Self {
        let canonical = serde_json::to_string(value).unwrap_or_default();
        Self::from_bytes(canonical.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for display
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_consistency() {
        let layout = json!([["id", "integer", false]]);
        assert_eq!(Checksum::from_json(&layout), Checksum::from_json(&layout));
        assert_eq!(Checksum::from_json(&layout).as_str().len(), 64);
    }

    #[test]
    fn test_checksum_different_content() {
        let a = Checksum::from_json(&json!(["a", "b"]));
        let b = Checksum::from_json(&json!(["b", "a"]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_prefix() {
        let checksum = Checksum::from_json(&json!({"fields": []}));
        assert_eq!(checksum.short().len(), 12);
        assert!(checksum.as_str().starts_with(checksum.short()));
        assert_eq!(checksum.to_string(), checksum.as_str());
    }
}
