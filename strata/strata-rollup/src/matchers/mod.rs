//! Matcher strategies for cross-repository identity matching.
//!
//! Each strategy projects graph nodes into [`MatchCandidate`]s carrying a
//! canonical match key, then scores candidate pairs from different
//! repositories. Matching is pure and synchronous; given the same graphs and
//! config it produces the same results.

mod arn;
mod name;
mod resource_id;
mod tag;

pub use arn::ArnMatcher;
pub use name::NameMatcher;
pub use resource_id::ResourceIdMatcher;
pub use tag::TagMatcher;

use crate::config::{ConfigReport, MatcherConfig};
use crate::error::{Result, RollupError};
use serde_json::Value;
use std::collections::HashMap;
use strata_core::{DependencyGraph, GraphNode, MatchResult, MatchStrategy, NodeType, RepositoryGraph};
use tracing::debug;

/// The projection of one node through one matcher strategy. Ephemeral; built
/// per matching pass.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub node: GraphNode,
    /// Canonical key; two nodes representing the same resource produce the
    /// same key under a given strategy
    pub match_key: String,
    pub repository_id: String,
    pub scan_id: String,
    /// Strategy-specific extras used during comparison
    pub attributes: HashMap<String, Value>,
}

/// Common contract for the four concrete matcher strategies.
pub trait Matcher: Send + Sync {
    /// The strategy this matcher implements
    fn strategy(&self) -> MatchStrategy;

    /// Cheap applicability filter for a single node
    fn can_handle(&self, node: &GraphNode) -> bool;

    /// Project every handleable node of a graph into candidates
    fn extract_candidates(
        &self,
        graph: &DependencyGraph,
        repository_id: &str,
        scan_id: &str,
    ) -> Vec<MatchCandidate>;

    /// Score a candidate pair from different repositories.
    ///
    /// Returns `None` when no match is justified; callers must not treat that
    /// as a zero-confidence result.
    fn compare(&self, a: &MatchCandidate, b: &MatchCandidate) -> Option<MatchResult>;

    /// Strategy-specific static config checks
    fn validate_config(&self) -> ConfigReport;

    /// Results below this confidence are discarded by the match runner
    fn min_confidence(&self) -> u8;
}

/// Whether two nodes are close enough in kind to be compared at all.
pub fn nodes_compatible(a: &GraphNode, b: &GraphNode) -> bool {
    a.node_type == b.node_type
        || a.node_type == NodeType::Unknown
        || b.node_type == NodeType::Unknown
}

/// Run one matcher across a set of repository graphs.
///
/// Candidates are compared pairwise across repositories only; results below
/// the matcher's minimum confidence are discarded.
pub fn find_matches(matcher: &dyn Matcher, graphs: &[RepositoryGraph]) -> Vec<MatchResult> {
    let candidates: Vec<Vec<MatchCandidate>> = graphs
        .iter()
        .map(|g| matcher.extract_candidates(&g.graph, &g.repository_id, &g.scan_id))
        .collect();

    let total: usize = candidates.iter().map(Vec::len).sum();
    debug!(
        strategy = %matcher.strategy(),
        candidates = total,
        "Extracted match candidates"
    );

    let min_confidence = matcher.min_confidence();
    let mut results = Vec::new();

    for (i, left) in candidates.iter().enumerate() {
        for right in candidates.iter().skip(i + 1) {
            for a in left {
                for b in right {
                    if !nodes_compatible(&a.node, &b.node) {
                        continue;
                    }
                    if let Some(result) = matcher.compare(a, b) {
                        if result.confidence >= min_confidence {
                            results.push(result);
                        }
                    }
                }
            }
        }
    }

    debug!(
        strategy = %matcher.strategy(),
        matches = results.len(),
        "Matching pass complete"
    );
    results
}

/// Constructs the concrete matcher selected by a config's strategy tag.
pub struct MatcherFactory;

impl MatcherFactory {
    /// Build a matcher from its config.
    ///
    /// Fails when the config's static validation reports errors; warnings are
    /// left to the caller to surface.
    pub fn create(config: MatcherConfig) -> Result<Box<dyn Matcher>> {
        let matcher: Box<dyn Matcher> = match config {
            MatcherConfig::Arn { .. } => Box::new(ArnMatcher::new(config)?),
            MatcherConfig::ResourceId { .. } => Box::new(ResourceIdMatcher::new(config)?),
            MatcherConfig::Name { .. } => Box::new(NameMatcher::new(config)?),
            MatcherConfig::Tag { .. } => Box::new(TagMatcher::new(config)?),
        };

        let report = matcher.validate_config();
        if report.has_errors() {
            let summary = report
                .errors
                .iter()
                .map(|e| format!("[{}] {}: {}", e.code, e.path, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RollupError::InvalidMatcherConfig(summary));
        }

        Ok(matcher)
    }
}

/// Shared helper: the tags/labels map of a node, minus ignored keys.
///
/// Reads the `tags` metadata object first, falling back to `labels` for
/// Kubernetes-sourced nodes.
pub(crate) fn node_tags(node: &GraphNode, ignore: &[String]) -> HashMap<String, String> {
    let raw = node
        .metadata
        .get("tags")
        .or_else(|| node.metadata.get("labels"))
        .and_then(Value::as_object);

    let mut tags = HashMap::new();
    if let Some(map) = raw {
        for (key, value) in map {
            if ignore.iter().any(|i| i.eq_ignore_ascii_case(key)) {
                continue;
            }
            if let Some(s) = value.as_str() {
                tags.insert(key.clone(), s.to_string());
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::SourceLocation;

    fn node(id: &str, node_type: NodeType) -> GraphNode {
        GraphNode::new(id, node_type, id, SourceLocation::new("main.tf", 1, 1))
    }

    #[test]
    fn test_nodes_compatible() {
        let a = node("a", NodeType::TerraformResource);
        let b = node("b", NodeType::TerraformResource);
        let c = node("c", NodeType::K8sDeployment);
        let u = node("u", NodeType::Unknown);

        assert!(nodes_compatible(&a, &b));
        assert!(!nodes_compatible(&a, &c));
        assert!(nodes_compatible(&a, &u));
    }

    #[test]
    fn test_node_tags_respects_ignore_list() {
        let n = node("a", NodeType::TerraformResource).with_metadata(
            "tags",
            serde_json::json!({"Environment": "prod", "ManagedBy": "terraform"}),
        );
        let tags = node_tags(&n, &["managedby".to_string()]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["Environment"], "prod");
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        // Tag matcher with no required tags fails static validation.
        let config = MatcherConfig::Tag {
            common: Default::default(),
            params: Default::default(),
        };
        assert!(MatcherFactory::create(config).is_err());
    }
}
