//! Configuration fingerprinting: deterministic identity for parameter sets.
//!
//! Decisions are stamped with the hash of the configuration that produced
//! them, so runs with different parameter sets can be told apart in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 hash (hex) of a canonical JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Hash any serializable value. Struct fields serialize in declaration
    /// order, so the JSON is deterministic for a given type.
    pub fn of<T: Serialize>(value: &T) -> Self {
        // Serialization of plain config structs cannot fail; an empty input
        // keeps the function total.
        let json = serde_json::to_vec(value).unwrap_or_default();
        Self::from_bytes(&json)
    }

    /// First 12 hex characters, enough to tell parameter sets apart in logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
