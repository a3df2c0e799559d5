//! ARN-based identity matching.

use super::{MatchCandidate, Matcher};
use crate::config::{CommonMatcherConfig, ConfigReport, MatcherConfig};
use crate::error::{Result, RollupError};
use serde_json::Value;
use std::collections::HashMap;
use strata_core::{DependencyGraph, GraphNode, MatchResult, MatchStrategy, ReferenceType};
use strata_refs::{normalize, validate_arn};

/// Metadata key carrying a node's ARN, as produced by the Terraform scanner.
const ARN_METADATA_KEY: &str = "arn";

/// Matches nodes whose validated, normalized ARNs are identical.
///
/// Normalization blanks region and account, so the same logical resource
/// matches across regions and accounts.
pub struct ArnMatcher {
    common: CommonMatcherConfig,
}

impl ArnMatcher {
    /// Build from an `Arn` config; any other strategy tag is rejected.
    pub fn new(config: MatcherConfig) -> Result<Self> {
        match config {
            MatcherConfig::Arn { common } => Ok(Self { common }),
            other => Err(RollupError::StrategyMismatch {
                expected: "arn".to_string(),
                actual: other.strategy().to_string(),
            }),
        }
    }

    fn node_arn(node: &GraphNode) -> Option<&str> {
        node.metadata_str(ARN_METADATA_KEY)
    }
}

impl Matcher for ArnMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Arn
    }

    fn can_handle(&self, node: &GraphNode) -> bool {
        Self::node_arn(node).is_some_and(|arn| validate_arn(arn).is_ok())
    }

    fn extract_candidates(
        &self,
        graph: &DependencyGraph,
        repository_id: &str,
        scan_id: &str,
    ) -> Vec<MatchCandidate> {
        let mut candidates = Vec::new();
        for node in graph.nodes.values() {
            let Some(raw) = Self::node_arn(node) else {
                continue;
            };
            let Ok(parsed) = validate_arn(raw) else {
                continue;
            };

            let mut attributes = HashMap::new();
            attributes.insert("service".to_string(), Value::String(parsed.service));
            attributes.insert("partition".to_string(), Value::String(parsed.partition));
            if let Some(resource_type) = parsed.resource_type {
                attributes.insert("resource_type".to_string(), Value::String(resource_type));
            }

            candidates.push(MatchCandidate {
                node: node.clone(),
                match_key: normalize(ReferenceType::Arn, raw),
                repository_id: repository_id.to_string(),
                scan_id: scan_id.to_string(),
                attributes,
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
            "normalized_arn".to_string(),
            Value::String(a.match_key.clone()),
        );

        Some(MatchResult {
            source_repository_id: a.repository_id.clone(),
            source_node_id: a.node.id.clone(),
            target_repository_id: b.repository_id.clone(),
            target_node_id: b.node.id.clone(),
            strategy: MatchStrategy::Arn,
            confidence,
            details,
        })
    }

    fn validate_config(&self) -> ConfigReport {
        // The ARN strategy has no strategy-specific parameters to check.
        ConfigReport::new()
    }

    fn min_confidence(&self) -> u8 {
        self.common.min_confidence
    }
}
