//! Unique identifier types for Strata entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for Strata entities.
///
/// Uses UUIDv4 for globally unique, collision-resistant IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrataId(Uuid);

impl StrataId {
    /// Create a new random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for StrataId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StrataId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_uniqueness() {
        let a = StrataId::new();
        let b = StrataId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_roundtrip() {
        let id = StrataId::new();
        let parsed = StrataId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
