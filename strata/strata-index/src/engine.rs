//! Extraction of external object references from scanned graphs.
//!
//! Walks every node's metadata for the keys scanners use to record external
//! identifiers, validates each raw value, and emits index entries with the
//! normalized id and parsed components. Invalid references are skipped and
//! counted, never fatal: one malformed ARN must not sink an index build.

use chrono::Utc;
use std::collections::HashMap;
use strata_core::id::StrataId;
use strata_core::types::{ExternalObjectEntry, GraphNode, ReferenceType, RepositoryGraph};
use strata_refs::{
    normalize, validate_arn, validate_container_image, validate_git_url, validate_k8s_reference,
    validate_storage_path,
};
use tracing::debug;

/// Metadata keys scanners write external identifiers under, with the
/// reference shape each key carries.
const REFERENCE_KEYS: &[(&str, ReferenceType)] = &[
    ("arn", ReferenceType::Arn),
    ("image", ReferenceType::ContainerImage),
    ("container_image", ReferenceType::ContainerImage),
    ("git_url", ReferenceType::GitUrl),
    ("repository_url", ReferenceType::GitUrl),
    ("storage_path", ReferenceType::StoragePath),
    ("storage_url", ReferenceType::StoragePath),
    ("k8s_reference", ReferenceType::K8sReference),
    ("object_ref", ReferenceType::K8sReference),
];

/// Result of extracting one repository graph.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub entries: Vec<ExternalObjectEntry>,
    /// Raw values that failed validation, with the error text
    pub invalid_references: Vec<InvalidReference>,
}

#[derive(Debug, Clone)]
pub struct InvalidReference {
    pub node_id: String,
    pub metadata_key: String,
    pub value: String,
    pub reason: String,
}

/// Stateless extractor turning graphs into index entries.
#[derive(Debug, Clone, Default)]
pub struct IndexEngine;

impl IndexEngine {
    pub fn new() -> Self {
        Self
    }

    /// Extract every valid external reference in a repository graph.
    ///
    /// Node iteration order is normalized so repeated extraction of the same
    /// graph yields identical reports.
    pub fn extract(&self, tenant_id: &str, repo: &RepositoryGraph) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        let mut nodes: Vec<&GraphNode> = repo.graph.nodes.values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        for node in nodes {
            for (key, kind) in REFERENCE_KEYS {
                let Some(raw) = node.metadata_str(key) else {
                    continue;
                };
                match self.parse_components(*kind, raw) {
                    Ok(components) => {
                        report.entries.push(ExternalObjectEntry {
                            id: StrataId::new(),
                            external_id: raw.to_string(),
                            reference_type: *kind,
                            normalized_id: normalize(*kind, raw),
                            tenant_id: tenant_id.to_string(),
                            repository_id: repo.repository_id.clone(),
                            scan_id: repo.scan_id.clone(),
                            node_id: node.id.clone(),
                            node_name: node.name.clone(),
                            node_type: node.node_type,
                            file_path: node.location.file.clone(),
                            components,
                            metadata: HashMap::new(),
                            indexed_at: Utc::now(),
                        });
                    }
                    Err(reason) => {
                        debug!(
                            "Skipping invalid {} reference on node {}: {}",
                            kind, node.id, reason
                        );
                        report.invalid_references.push(InvalidReference {
                            node_id: node.id.clone(),
                            metadata_key: key.to_string(),
                            value: raw.to_string(),
                            reason,
                        });
                    }
                }
            }
        }

        report
    }

    /// Validate a raw value and break it into named components
    fn parse_components(
        &self,
        kind: ReferenceType,
        raw: &str,
    ) -> std::result::Result<HashMap<String, String>, String> {
        let mut components = HashMap::new();
        match kind {
            ReferenceType::Arn => {
                let arn = validate_arn(raw).map_err(|e| e.to_string())?;
                components.insert("partition".to_string(), arn.partition);
                components.insert("service".to_string(), arn.service);
                if !arn.region.is_empty() {
                    components.insert("region".to_string(), arn.region);
                }
                if !arn.account.is_empty() {
                    components.insert("account".to_string(), arn.account);
                }
                components.insert("resource".to_string(), arn.resource);
                if let Some(rt) = arn.resource_type {
                    components.insert("resource_type".to_string(), rt);
                }
            }
            ReferenceType::ContainerImage => {
                let image = validate_container_image(raw).map_err(|e| e.to_string())?;
                if let Some(registry) = image.registry {
                    components.insert("registry".to_string(), registry);
                }
                components.insert("repository".to_string(), image.repository);
                if let Some(tag) = image.tag {
                    components.insert("tag".to_string(), tag);
                }
                if let Some(digest) = image.digest {
                    components.insert("digest".to_string(), digest);
                }
            }
            ReferenceType::GitUrl => {
                let git = validate_git_url(raw).map_err(|e| e.to_string())?;
                components.insert("protocol".to_string(), git.protocol);
                components.insert("host".to_string(), git.host);
                components.insert("owner".to_string(), git.owner);
                components.insert("repo".to_string(), git.repo);
            }
            ReferenceType::StoragePath => {
                let path = validate_storage_path(raw).map_err(|e| e.to_string())?;
                components.insert("provider".to_string(), path.provider.to_string());
                components.insert("bucket".to_string(), path.bucket);
                if let Some(key) = path.key {
                    components.insert("key".to_string(), key);
                }
                if let Some(account) = path.account {
                    components.insert("account".to_string(), account);
                }
            }
            ReferenceType::K8sReference => {
                let k8s = validate_k8s_reference(raw).map_err(|e| e.to_string())?;
                if let Some(namespace) = k8s.namespace {
                    components.insert("namespace".to_string(), namespace);
                }
                components.insert("kind".to_string(), k8s.kind);
                components.insert("name".to_string(), k8s.name);
            }
        }
        Ok(components)
    }
}

/// Guess the reference shape of a raw lookup string by trying each validator.
///
/// ARNs and storage paths have unambiguous prefixes and go first; container
/// images accept almost anything and go last.
pub fn detect_reference_type(raw: &str) -> Option<ReferenceType> {
    if validate_arn(raw).is_ok() {
        Some(ReferenceType::Arn)
    } else if validate_storage_path(raw).is_ok() {
        Some(ReferenceType::StoragePath)
    } else if validate_git_url(raw).is_ok() {
        Some(ReferenceType::GitUrl)
    } else if validate_k8s_reference(raw).is_ok() {
        Some(ReferenceType::K8sReference)
    } else if validate_container_image(raw).is_ok() {
        Some(ReferenceType::ContainerImage)
    } else {
        None
    }
}
