//! Metadata construction utilities.

use serde_json::Value;
use std::collections::HashMap;

/// Builder for node/edge/entry metadata maps.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    metadata: HashMap<String, Value>,
}

impl MetadataBuilder {
    /// Create a new metadata builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key-value pair
    pub fn add(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a key-value pair if the value is Some
    pub fn add_option(mut self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        if let Some(v) = value {
            self.metadata.insert(key.into(), v.into());
        }
        self
    }

    /// Build the metadata map
    pub fn build(self) -> HashMap<String, Value> {
        self.metadata
    }
}
