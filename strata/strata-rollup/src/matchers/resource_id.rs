//! Resource-identifier matching.

use super::{MatchCandidate, Matcher};
use crate::config::{CommonMatcherConfig, ConfigReport, MatcherConfig};
use crate::error::{Result, RollupError};
use serde_json::Value;
use std::collections::HashMap;
use strata_core::{DependencyGraph, GraphNode, MatchResult, MatchStrategy, NodeType, ReferenceType};
use strata_refs::{normalize, validate_k8s_reference};

/// Metadata key carrying a provider-assigned resource identifier.
const RESOURCE_ID_KEY: &str = "resource_id";
/// Metadata key carrying a Kubernetes namespace.
const NAMESPACE_KEY: &str = "namespace";

/// Matches nodes by validated external resource identifiers.
///
/// A node's identifier is its `resource_id` metadata when present; Kubernetes
/// nodes without one fall back to a constructed `namespace/kind/name`
/// reference. Identifiers are normalized before comparison.
pub struct ResourceIdMatcher {
    common: CommonMatcherConfig,
}

impl ResourceIdMatcher {
    /// Build from a `ResourceId` config; any other strategy tag is rejected.
    pub fn new(config: MatcherConfig) -> Result<Self> {
        match config {
            MatcherConfig::ResourceId { common } => Ok(Self { common }),
            other => Err(RollupError::StrategyMismatch {
                expected: "resource_id".to_string(),
                actual: other.strategy().to_string(),
            }),
        }
    }

    /// The canonical identifier for a node, when one can be derived.
    fn node_identifier(node: &GraphNode) -> Option<String> {
        if let Some(raw) = node.metadata_str(RESOURCE_ID_KEY) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            // Identifiers shaped like k8s references get k8s normalization;
            // anything else is compared lower-cased.
            return if validate_k8s_reference(trimmed).is_ok() {
                Some(normalize(ReferenceType::K8sReference, trimmed))
            } else {
                Some(trimmed.to_lowercase())
            };
        }

        let kind = k8s_kind(node.node_type)?;
        let reference = match node.metadata_str(NAMESPACE_KEY) {
            Some(namespace) => format!("{}/{}/{}", namespace, kind, node.name),
            None => format!("{}/{}", kind, node.name),
        };
        validate_k8s_reference(&reference)
            .ok()
            .map(|_| normalize(ReferenceType::K8sReference, &reference))
    }
}

/// The Kubernetes kind segment for a node type, when it has one.
fn k8s_kind(node_type: NodeType) -> Option<&'static str> {
    match node_type {
        NodeType::K8sDeployment => Some("deployment"),
        NodeType::K8sService => Some("service"),
        NodeType::K8sStatefulSet => Some("statefulset"),
        NodeType::K8sConfigMap => Some("configmap"),
        NodeType::K8sSecret => Some("secret"),
        NodeType::K8sIngress => Some("ingress"),
        _ => None,
    }
}

impl Matcher for ResourceIdMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::ResourceId
    }

    fn can_handle(&self, node: &GraphNode) -> bool {
        Self::node_identifier(node).is_some()
    }

    fn extract_candidates(
        &self,
        graph: &DependencyGraph,
        repository_id: &str,
        scan_id: &str,
    ) -> Vec<MatchCandidate> {
        let mut candidates = Vec::new();
        for node in graph.nodes.values() {
            let Some(identifier) = Self::node_identifier(node) else {
                continue;
            };

            candidates.push(MatchCandidate {
                node: node.clone(),
                match_key: identifier,
                repository_id: repository_id.to_string(),
                scan_id: scan_id.to_string(),
                attributes: HashMap::new(),
            });
        }
        candidates
    }

    fn compare(&self, a: &MatchCandidate, b: &MatchCandidate) -> Option<MatchResult> {
        if a.match_key != b.match_key {
            return None;
        }

        let confidence = if a.node.node_type == b.node.node_type {
            100
        } else {
            95
        };

        let mut details = HashMap::new();
        details.insert(
            "resource_id".to_string(),
            Value::String(a.match_key.clone()),
        );

        Some(MatchResult {
            source_repository_id: a.repository_id.clone(),
            source_node_id: a.node.id.clone(),
            target_repository_id: b.repository_id.clone(),
            target_node_id: b.node.id.clone(),
            strategy: MatchStrategy::ResourceId,
            confidence,
            details,
        })
    }

    fn validate_config(&self) -> ConfigReport {
        ConfigReport::new()
    }

    fn min_confidence(&self) -> u8 {
        self.common.min_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::SourceLocation;

    fn matcher() -> ResourceIdMatcher {
        ResourceIdMatcher::new(MatcherConfig::ResourceId {
            common: CommonMatcherConfig::default(),
        })
        .unwrap()
    }

    fn k8s_node(id: &str, name: &str, namespace: &str) -> GraphNode {
        GraphNode::new(
            id,
            NodeType::K8sDeployment,
            name,
            SourceLocation::new("deploy.yaml", 1, 20),
        )
        .with_metadata("namespace", Value::String(namespace.to_string()))
    }

    fn extract(m: &ResourceIdMatcher, node: GraphNode, repo: &str) -> MatchCandidate {
        let mut graph = DependencyGraph::new();
        graph.add_node(node);
        m.extract_candidates(&graph, repo, "scan-1").pop().unwrap()
    }

    #[test]
    fn test_k8s_nodes_build_reference_keys() {
        let m = matcher();
        let candidate = extract(&m, k8s_node("n1", "API-Server", "Prod"), "repo-a");
        assert_eq!(candidate.match_key, "prod/deployment/api-server");
    }

    #[test]
    fn test_explicit_resource_id_wins() {
        let m = matcher();
        let node = k8s_node("n1", "api", "prod")
            .with_metadata("resource_id", Value::String("i-0abc123".to_string()));
        let candidate = extract(&m, node, "repo-a");
        assert_eq!(candidate.match_key, "i-0abc123");
    }

    #[test]
    fn test_same_reference_matches_across_repos() {
        let m = matcher();
        let a = extract(&m, k8s_node("n1", "api", "prod"), "repo-a");
        let b = extract(&m, k8s_node("n9", "api", "prod"), "repo-b");

        let result = m.compare(&a, &b).unwrap();
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn test_terraform_node_without_resource_id_not_handled() {
        let m = matcher();
        let node = GraphNode::new(
            "n1",
            NodeType::TerraformResource,
            "bucket",
            SourceLocation::new("main.tf", 1, 5),
        );
        assert!(!m.can_handle(&node));
    }
}
