//! Core types used across the Strata system.

use crate::id::StrataId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Kinds of nodes produced by repository scans.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    TerraformResource,
    TerraformModule,
    TerraformData,
    K8sDeployment,
    K8sService,
    K8sStatefulSet,
    K8sConfigMap,
    K8sSecret,
    K8sIngress,
    ContainerImage,
    GitRepository,
    Unknown,
}

impl NodeType {
    /// Whether this node kind originates from a Terraform scan
    pub fn is_terraform(&self) -> bool {
        matches!(
            self,
            Self::TerraformResource | Self::TerraformModule | Self::TerraformData
        )
    }

    /// Whether this node kind originates from a Kubernetes manifest scan
    pub fn is_kubernetes(&self) -> bool {
        matches!(
            self,
            Self::K8sDeployment
                | Self::K8sService
                | Self::K8sStatefulSet
                | Self::K8sConfigMap
                | Self::K8sSecret
                | Self::K8sIngress
        )
    }
}

/// Kinds of dependency edges between graph nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    DependsOn,
    References,
    Uses,
    Deploys,
    Configures,
    CrossRepoReference,
    Unknown,
}

/// Source position of a node within its repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceLocation {
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
    pub column_start: Option<u32>,
    pub column_end: Option<u32>,
}

impl SourceLocation {
    /// Create a location spanning whole lines
    pub fn new(file: impl Into<String>, line_start: u32, line_end: u32) -> Self {
        Self {
            file: file.into(),
            line_start,
            line_end,
            column_start: None,
            column_end: None,
        }
    }
}

/// A node in a repository dependency graph. Immutable once produced by a scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Unique within the owning graph
    pub id: String,
    pub node_type: NodeType,
    pub name: String,
    pub location: SourceLocation,
    /// Carries tags/labels, ARNs, resource types and other scan output
    pub metadata: HashMap<String, Value>,
}

impl GraphNode {
    /// Create a node with empty metadata
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        name: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            location,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry, consuming and returning the node
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Look up a metadata value as a string slice
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// A dependency edge between two nodes. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    pub edge_type: EdgeType,
    pub label: Option<String>,
    /// Detection confidence, 0-100
    pub confidence: u8,
    /// True when the edge was inferred rather than declared
    pub implicit: bool,
    /// The attribute that produced this edge, when known
    pub attribute: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl GraphEdge {
    /// Create an explicit edge with full confidence
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type,
            label: None,
            confidence: 100,
            implicit: false,
            attribute: None,
            metadata: HashMap::new(),
        }
    }
}

/// A per-repository dependency graph, read-only input to matching and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencyGraph {
    /// Node id → node
    pub nodes: HashMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: HashMap<String, Value>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, keyed by its id
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Append an edge
    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.push(edge);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// A dependency graph together with the repository and scan that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryGraph {
    pub repository_id: String,
    pub scan_id: String,
    pub graph: DependencyGraph,
}

impl RepositoryGraph {
    pub fn new(
        repository_id: impl Into<String>,
        scan_id: impl Into<String>,
        graph: DependencyGraph,
    ) -> Self {
        Self {
            repository_id: repository_id.into(),
            scan_id: scan_id.into(),
            graph,
        }
    }
}

/// Matching strategies available to rollups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Arn,
    ResourceId,
    Name,
    Tag,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Arn => "arn",
            Self::ResourceId => "resource_id",
            Self::Name => "name",
            Self::Tag => "tag",
        };
        write!(f, "{s}")
    }
}

/// A scored identity match between two nodes from different repositories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub source_repository_id: String,
    pub source_node_id: String,
    pub target_repository_id: String,
    pub target_node_id: String,
    pub strategy: MatchStrategy,
    /// 0-100; results below the configured minimum are discarded by the caller
    pub confidence: u8,
    pub details: HashMap<String, Value>,
}

/// Provenance of one merged node member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedLocation {
    pub repository_id: String,
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
}

/// Match provenance carried on a merged node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchInfo {
    /// Strategy of the highest-confidence match that formed the group
    pub strategy: MatchStrategy,
    /// Maximum confidence among the group's matches
    pub confidence: u8,
    /// Number of match results that formed the group
    pub match_count: usize,
}

/// A logical node produced by merging matched nodes across repositories.
///
/// `source_node_ids` always has length >= 2; single-member groups pass through
/// the merge unchanged as unmatched nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedNode {
    pub id: String,
    pub source_node_ids: Vec<String>,
    pub source_repository_ids: Vec<String>,
    pub node_type: NodeType,
    pub name: String,
    pub locations: Vec<MergedLocation>,
    pub metadata: HashMap<String, Value>,
    pub match_info: MatchInfo,
}

/// Shapes of external identifiers recognized by the index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Arn,
    ContainerImage,
    GitUrl,
    StoragePath,
    K8sReference,
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Arn => "arn",
            Self::ContainerImage => "container_image",
            Self::GitUrl => "git_url",
            Self::StoragePath => "storage_path",
            Self::K8sReference => "k8s_reference",
        };
        write!(f, "{s}")
    }
}

/// One indexed (node, external reference) pair.
///
/// `normalized_id` is a pure function of `external_id` and `reference_type`;
/// re-normalizing a normalized id is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalObjectEntry {
    pub id: StrataId,
    pub external_id: String,
    pub reference_type: ReferenceType,
    pub normalized_id: String,
    pub tenant_id: String,
    pub repository_id: String,
    pub scan_id: String,
    pub node_id: String,
    pub node_name: String,
    pub node_type: NodeType,
    pub file_path: String,
    /// Parsed identifier components (service, region, registry, ...)
    pub components: HashMap<String, String>,
    pub metadata: HashMap<String, Value>,
    pub indexed_at: DateTime<Utc>,
}

/// Optional narrowing of a forward lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LookupFilter {
    pub repository_id: Option<String>,
    pub reference_type: Option<ReferenceType>,
}

/// Scope of an index invalidation. At least one field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvalidationFilter {
    pub repository_id: Option<String>,
    pub scan_id: Option<String>,
    pub reference_type: Option<ReferenceType>,
}

impl InvalidationFilter {
    /// True when no field narrows the scope
    pub fn is_empty(&self) -> bool {
        self.repository_id.is_none() && self.scan_id.is_none() && self.reference_type.is_none()
    }

    /// Whether an entry falls inside this filter's scope
    pub fn matches(&self, entry: &ExternalObjectEntry) -> bool {
        if let Some(repo) = &self.repository_id {
            if &entry.repository_id != repo {
                return false;
            }
        }
        if let Some(scan) = &self.scan_id {
            if &entry.scan_id != scan {
                return false;
            }
        }
        if let Some(kind) = &self.reference_type {
            if &entry.reference_type != kind {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_construction() {
        let mut graph = DependencyGraph::new();
        graph.add_node(GraphNode::new(
            "n1",
            NodeType::TerraformResource,
            "bucket",
            SourceLocation::new("main.tf", 1, 10),
        ));
        graph.add_node(GraphNode::new(
            "n2",
            NodeType::TerraformResource,
            "policy",
            SourceLocation::new("main.tf", 12, 20),
        ));
        graph.add_edge(GraphEdge::new("e1", "n2", "n1", EdgeType::References));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_metadata_str_helper() {
        let node = GraphNode::new(
            "n1",
            NodeType::K8sDeployment,
            "api",
            SourceLocation::new("deploy.yaml", 1, 30),
        )
        .with_metadata("image", Value::String("nginx:1.25".into()));

        assert_eq!(node.metadata_str("image"), Some("nginx:1.25"));
        assert_eq!(node.metadata_str("missing"), None);
    }

    #[test]
    fn test_invalidation_filter_matching() {
        let filter = InvalidationFilter {
            repository_id: Some("repo-a".into()),
            ..Default::default()
        };
        assert!(!filter.is_empty());
        assert!(InvalidationFilter::default().is_empty());
    }
}
