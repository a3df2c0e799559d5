//! Mapping between index entries and their persisted row form.
//!
//! Stores persist [`ExternalObjectRecord`] rows: flat strings plus JSON text
//! for the nested maps. Conversion is confined to this boundary; everything
//! above it works with typed [`ExternalObjectEntry`] values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strata_core::error::{Result, StrataError};
use strata_core::id::StrataId;
use strata_core::types::{ExternalObjectEntry, NodeType, ReferenceType};

/// Persisted row form of an index entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalObjectRecord {
    pub id: String,
    pub external_id: String,
    pub reference_type: String,
    pub normalized_id: String,
    pub tenant_id: String,
    pub repository_id: String,
    pub scan_id: String,
    pub node_id: String,
    pub node_name: String,
    pub node_type: String,
    pub file_path: String,
    /// JSON object of parsed identifier components
    pub components: String,
    /// JSON object of free-form metadata
    pub metadata: String,
    /// RFC 3339 timestamp
    pub indexed_at: String,
}

/// Converts entries to records and back. Stateless; constructed explicitly by
/// whichever store uses it.
#[derive(Debug, Clone, Default)]
pub struct EntryMapper;

impl EntryMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn to_record(&self, entry: &ExternalObjectEntry) -> Result<ExternalObjectRecord> {
        Ok(ExternalObjectRecord {
            id: entry.id.to_string(),
            external_id: entry.external_id.clone(),
            reference_type: enum_tag(&entry.reference_type)?,
            normalized_id: entry.normalized_id.clone(),
            tenant_id: entry.tenant_id.clone(),
            repository_id: entry.repository_id.clone(),
            scan_id: entry.scan_id.clone(),
            node_id: entry.node_id.clone(),
            node_name: entry.node_name.clone(),
            node_type: enum_tag(&entry.node_type)?,
            file_path: entry.file_path.clone(),
            components: serde_json::to_string(&entry.components)?,
            metadata: serde_json::to_string(&entry.metadata)?,
            indexed_at: entry.indexed_at.to_rfc3339(),
        })
    }

    pub fn to_entry(&self, record: &ExternalObjectRecord) -> Result<ExternalObjectEntry> {
        let id = StrataId::parse(&record.id)
            .map_err(|e| StrataError::store(format!("Malformed entry id {}: {}", record.id, e)))?;
        let reference_type: ReferenceType = parse_enum_tag(&record.reference_type)?;
        let node_type: NodeType = parse_enum_tag(&record.node_type)?;
        let components: HashMap<String, String> = serde_json::from_str(&record.components)?;
        let metadata: HashMap<String, Value> = serde_json::from_str(&record.metadata)?;
        let indexed_at = chrono::DateTime::parse_from_rfc3339(&record.indexed_at)
            .map_err(|e| {
                StrataError::store(format!("Malformed timestamp {}: {}", record.indexed_at, e))
            })?
            .with_timezone(&chrono::Utc);

        Ok(ExternalObjectEntry {
            id,
            external_id: record.external_id.clone(),
            reference_type,
            normalized_id: record.normalized_id.clone(),
            tenant_id: record.tenant_id.clone(),
            repository_id: record.repository_id.clone(),
            scan_id: record.scan_id.clone(),
            node_id: record.node_id.clone(),
            node_name: record.node_name.clone(),
            node_type,
            file_path: record.file_path.clone(),
            components,
            metadata,
            indexed_at,
        })
    }
}

/// The snake_case serde tag of a fieldless enum variant
fn enum_tag<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        other => Err(StrataError::store(format!(
            "Expected string tag, got {other}"
        ))),
    }
}

fn parse_enum_tag<T: for<'de> Deserialize<'de>>(tag: &str) -> Result<T> {
    Ok(serde_json::from_value(Value::String(tag.to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_entry() -> ExternalObjectEntry {
        let mut components = HashMap::new();
        components.insert("service".to_string(), "s3".to_string());
        ExternalObjectEntry {
            id: StrataId::new(),
            external_id: "arn:aws:s3:::Assets".to_string(),
            reference_type: ReferenceType::Arn,
            normalized_id: "arn:aws:s3:::assets".to_string(),
            tenant_id: "t1".to_string(),
            repository_id: "repo-a".to_string(),
            scan_id: "scan-1".to_string(),
            node_id: "n1".to_string(),
            node_name: "assets".to_string(),
            node_type: NodeType::TerraformResource,
            file_path: "main.tf".to_string(),
            components,
            metadata: HashMap::new(),
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn test_entry_record_round_trip() {
        let mapper = EntryMapper::new();
        let entry = sample_entry();

        let record = mapper.to_record(&entry).unwrap();
        assert_eq!(record.reference_type, "arn");
        assert_eq!(record.node_type, "terraform_resource");

        let back = mapper.to_entry(&record).unwrap();
        assert_eq!(back.id, entry.id);
        assert_eq!(back.normalized_id, entry.normalized_id);
        assert_eq!(back.components, entry.components);
        assert_eq!(back.reference_type, ReferenceType::Arn);
    }

    #[test]
    fn test_malformed_record_is_a_store_error() {
        let mapper = EntryMapper::new();
        let mut record = mapper.to_record(&sample_entry()).unwrap();
        record.id = "not-a-uuid".to_string();
        assert!(mapper.to_entry(&record).is_err());
    }
}
