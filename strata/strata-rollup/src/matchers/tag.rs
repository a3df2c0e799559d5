//! Tag-based matching for Terraform resources.

use super::{node_tags, MatchCandidate, Matcher};
use crate::config::{
    CommonMatcherConfig, ConfigReport, MatcherConfig, RequiredTag, TagMatchMode, TagMatcherParams,
};
use crate::error::{Result, RollupError};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use strata_core::{DependencyGraph, GraphNode, MatchResult, MatchStrategy, NodeType};

/// Metadata key carrying the Terraform resource type (`aws_s3_bucket`, ...).
const RESOURCE_TYPE_KEY: &str = "resource_type";

/// Warning threshold for `any`-mode required tag counts.
const ANY_MODE_TAG_WARNING_LIMIT: usize = 5;

/// Matches Terraform resources by their tag sets.
///
/// The match key is the sorted `key=value` join of the required tags a node
/// satisfies, so two nodes whose tags were authored in different order still
/// produce equal keys. A required tag without a value constraint accepts any
/// value, but the node's actual value still contributes to the key.
pub struct TagMatcher {
    common: CommonMatcherConfig,
    params: TagMatcherParams,
    /// Compiled value patterns, parallel to `params.required_tags`; `None`
    /// for absent or unparseable patterns
    value_patterns: Vec<Option<Regex>>,
}

impl TagMatcher {
    /// Build from a `Tag` config; any other strategy tag is rejected.
    pub fn new(config: MatcherConfig) -> Result<Self> {
        match config {
            MatcherConfig::Tag { common, params } => {
                let value_patterns = params
                    .required_tags
                    .iter()
                    .map(|t| t.value_pattern.as_deref().and_then(|p| Regex::new(p).ok()))
                    .collect();
                Ok(Self {
                    common,
                    params,
                    value_patterns,
                })
            }
            other => Err(RollupError::StrategyMismatch {
                expected: "tag".to_string(),
                actual: other.strategy().to_string(),
            }),
        }
    }

    /// Whether a node's tag satisfies one required-tag constraint, returning
    /// the actual value when it does.
    fn satisfied_value<'a>(
        &self,
        index: usize,
        required: &RequiredTag,
        tags: &'a HashMap<String, String>,
    ) -> Option<&'a str> {
        let actual = tags.get(&required.key)?;
        if let Some(expected) = &required.value {
            if actual != expected {
                return None;
            }
        }
        if required.value_pattern.is_some() {
            let re = self.value_patterns.get(index).and_then(Option::as_ref)?;
            if !re.is_match(actual) {
                return None;
            }
        }
        Some(actual)
    }

    /// The satisfied `key=value` pairs for a node, or `None` when the node
    /// does not meet the configured match mode.
    fn satisfied_pairs(&self, tags: &HashMap<String, String>) -> Option<Vec<String>> {
        let mut pairs = Vec::new();
        for (index, required) in self.params.required_tags.iter().enumerate() {
            if let Some(value) = self.satisfied_value(index, required, tags) {
                pairs.push(format!("{}={}", required.key, value));
            } else if self.params.match_mode == TagMatchMode::All {
                return None;
            }
        }
        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        Some(pairs)
    }
}

impl Matcher for TagMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Tag
    }

    fn can_handle(&self, node: &GraphNode) -> bool {
        node.node_type == NodeType::TerraformResource
            && !node_tags(node, &self.params.ignore_tags).is_empty()
    }

    fn extract_candidates(
        &self,
        graph: &DependencyGraph,
        repository_id: &str,
        scan_id: &str,
    ) -> Vec<MatchCandidate> {
        let mut candidates = Vec::new();
        for node in graph.nodes.values() {
            if !self.can_handle(node) {
                continue;
            }
            let tags = node_tags(node, &self.params.ignore_tags);
            let Some(pairs) = self.satisfied_pairs(&tags) else {
                continue;
            };

            let mut attributes = HashMap::new();
            attributes.insert(
                "tags".to_string(),
                Value::Object(
                    tags.iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            );
            if let Some(resource_type) = node.metadata_str(RESOURCE_TYPE_KEY) {
                attributes.insert(
                    RESOURCE_TYPE_KEY.to_string(),
                    Value::String(resource_type.to_string()),
                );
            }

            candidates.push(MatchCandidate {
                node: node.clone(),
                match_key: pairs.join("|"),
                repository_id: repository_id.to_string(),
                scan_id: scan_id.to_string(),
                attributes,
            });
        }
        candidates
    }

    fn compare(&self, a: &MatchCandidate, b: &MatchCandidate) -> Option<MatchResult> {
        let tags_a = attribute_tags(a);
        let tags_b = attribute_tags(b);

        let union: BTreeSet<&String> = tags_a.keys().chain(tags_b.keys()).collect();
        if union.is_empty() {
            return None;
        }

        let matching = tags_a
            .iter()
            .filter(|(key, value)| tags_b.get(*key) == Some(value))
            .count();
        if matching == 0 {
            return None;
        }

        let mut confidence = ((matching as f64 / union.len() as f64) * 100.0).round() as u8;

        let type_a = a.attributes.get(RESOURCE_TYPE_KEY).and_then(Value::as_str);
        let type_b = b.attributes.get(RESOURCE_TYPE_KEY).and_then(Value::as_str);
        if let (Some(ta), Some(tb)) = (type_a, type_b) {
            if ta == tb {
                confidence = confidence.saturating_add(5).min(100);
            }
        }

        let mut details = HashMap::new();
        details.insert("matching_tags".to_string(), Value::from(matching));
        details.insert("union_tags".to_string(), Value::from(union.len()));
        details.insert("match_key".to_string(), Value::String(a.match_key.clone()));

        Some(MatchResult {
            source_repository_id: a.repository_id.clone(),
            source_node_id: a.node.id.clone(),
            target_repository_id: b.repository_id.clone(),
            target_node_id: b.node.id.clone(),
            strategy: MatchStrategy::Tag,
            confidence,
            details,
        })
    }

    fn validate_config(&self) -> ConfigReport {
        let mut report = ConfigReport::new();

        if self.params.required_tags.is_empty() {
            report.error(
                "NO_REQUIRED_TAGS",
                "required_tags",
                "at least one required tag must be configured",
            );
        }

        let mut seen_keys: Vec<String> = Vec::new();
        for (index, tag) in self.params.required_tags.iter().enumerate() {
            let path = format!("required_tags[{index}]");
            if tag.key.trim().is_empty() {
                report.error("EMPTY_TAG_KEY", &path, "tag key is empty");
            }
            if let Some(pattern) = &tag.value_pattern {
                if let Err(e) = Regex::new(pattern) {
                    report.error(
                        "INVALID_TAG_VALUE_PATTERN",
                        format!("{path}.value_pattern"),
                        e.to_string(),
                    );
                }
            }
            if tag.value.is_some() && tag.value_pattern.is_some() {
                report.warning(
                    "REDUNDANT_TAG_CONSTRAINT",
                    &path,
                    "both value and value_pattern set; value_pattern is redundant",
                );
            }
            let lowered = tag.key.to_lowercase();
            if seen_keys.contains(&lowered) {
                report.warning(
                    "DUPLICATE_TAG_KEY",
                    &path,
                    format!("tag key '{}' appears more than once", tag.key),
                );
            }
            seen_keys.push(lowered);
        }

        if self.params.match_mode == TagMatchMode::Any
            && self.params.required_tags.len() > ANY_MODE_TAG_WARNING_LIMIT
        {
            report.warning(
                "ANY_MODE_FALSE_POSITIVE_RISK",
                "match_mode",
                format!(
                    "'any' mode with {} required tags is prone to false positives",
                    self.params.required_tags.len()
                ),
            );
        }

        report
    }

    fn min_confidence(&self) -> u8 {
        self.common.min_confidence
    }
}

/// The full tag map stored on a candidate during extraction.
fn attribute_tags(candidate: &MatchCandidate) -> HashMap<String, String> {
    candidate
        .attributes
        .get("tags")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::SourceLocation;

    fn tagged_node(id: &str, tags: serde_json::Value) -> GraphNode {
        GraphNode::new(
            id,
            NodeType::TerraformResource,
            id,
            SourceLocation::new("main.tf", 1, 5),
        )
        .with_metadata("tags", tags)
    }

    fn matcher(params: TagMatcherParams) -> TagMatcher {
        TagMatcher::new(MatcherConfig::Tag {
            common: CommonMatcherConfig::default(),
            params,
        })
        .unwrap()
    }

    fn env_project_params() -> TagMatcherParams {
        TagMatcherParams {
            required_tags: vec![
                RequiredTag::key_only("Environment"),
                RequiredTag::key_only("Project"),
            ],
            match_mode: TagMatchMode::All,
            ignore_tags: vec![],
        }
    }

    fn candidate(m: &TagMatcher, node: GraphNode, repo: &str) -> MatchCandidate {
        let mut graph = DependencyGraph::new();
        graph.add_node(node);
        m.extract_candidates(&graph, repo, "scan-1").pop().unwrap()
    }

    #[test]
    fn test_match_key_is_order_independent() {
        let m = matcher(env_project_params());
        let a = candidate(
            &m,
            tagged_node(
                "a",
                serde_json::json!({"Environment": "production", "Project": "myapp"}),
            ),
            "repo-a",
        );
        let b = candidate(
            &m,
            tagged_node(
                "b",
                serde_json::json!({"Project": "myapp", "Environment": "production"}),
            ),
            "repo-b",
        );

        assert_eq!(a.match_key, "Environment=production|Project=myapp");
        assert_eq!(a.match_key, b.match_key);
    }

    #[test]
    fn test_equal_tag_sets_score_high() {
        let m = matcher(env_project_params());
        let tags = serde_json::json!({"Environment": "production", "Project": "myapp"});
        let a = candidate(&m, tagged_node("a", tags.clone()), "repo-a");
        let b = candidate(&m, tagged_node("b", tags), "repo-b");

        let result = m.compare(&a, &b).unwrap();
        assert!(result.confidence >= 85);
    }

    #[test]
    fn test_resource_type_bonus_capped_at_100() {
        let m = matcher(env_project_params());
        let tags = serde_json::json!({"Environment": "prod", "Project": "app"});
        let node_a =
            tagged_node("a", tags.clone()).with_metadata("resource_type", "aws_s3_bucket".into());
        let node_b = tagged_node("b", tags).with_metadata("resource_type", "aws_s3_bucket".into());
        let a = candidate(&m, node_a, "repo-a");
        let b = candidate(&m, node_b, "repo-b");

        assert_eq!(m.compare(&a, &b).unwrap().confidence, 100);
    }

    #[test]
    fn test_partial_overlap_scores_by_union_ratio() {
        let m = matcher(TagMatcherParams {
            required_tags: vec![RequiredTag::key_only("Environment")],
            match_mode: TagMatchMode::Any,
            ignore_tags: vec![],
        });
        let a = candidate(
            &m,
            tagged_node("a", serde_json::json!({"Environment": "prod", "Team": "core"})),
            "repo-a",
        );
        let b = candidate(
            &m,
            tagged_node("b", serde_json::json!({"Environment": "prod", "Owner": "ops"})),
            "repo-b",
        );

        // 1 matching of 3 union keys.
        assert_eq!(m.compare(&a, &b).unwrap().confidence, 33);
    }

    #[test]
    fn test_no_overlap_is_none() {
        let m = matcher(TagMatcherParams {
            required_tags: vec![RequiredTag::key_only("Environment")],
            match_mode: TagMatchMode::Any,
            ignore_tags: vec![],
        });
        let a = candidate(
            &m,
            tagged_node("a", serde_json::json!({"Environment": "prod"})),
            "repo-a",
        );
        let b = candidate(
            &m,
            tagged_node("b", serde_json::json!({"Environment": "staging"})),
            "repo-b",
        );
        assert!(m.compare(&a, &b).is_none());
    }

    #[test]
    fn test_all_mode_requires_every_tag() {
        let m = matcher(env_project_params());
        let mut graph = DependencyGraph::new();
        graph.add_node(tagged_node(
            "a",
            serde_json::json!({"Environment": "prod"}),
        ));
        assert!(m.extract_candidates(&graph, "repo-a", "scan-1").is_empty());
    }

    #[test]
    fn test_value_constraint() {
        let m = matcher(TagMatcherParams {
            required_tags: vec![RequiredTag::with_value("Environment", "prod")],
            match_mode: TagMatchMode::All,
            ignore_tags: vec![],
        });
        let mut graph = DependencyGraph::new();
        graph.add_node(tagged_node(
            "a",
            serde_json::json!({"Environment": "staging"}),
        ));
        assert!(m.extract_candidates(&graph, "repo-a", "scan-1").is_empty());
    }

    #[test]
    fn test_validation_codes() {
        let m = matcher(TagMatcherParams {
            required_tags: vec![
                RequiredTag {
                    key: "".to_string(),
                    value: None,
                    value_pattern: Some("(bad".to_string()),
                },
                RequiredTag::key_only("Env"),
                RequiredTag::key_only("env"),
            ],
            match_mode: TagMatchMode::All,
            ignore_tags: vec![],
        });
        let report = m.validate_config();
        let codes: Vec<&str> = report.errors.iter().map(|e| e.code.as_str()).collect();
        assert!(codes.contains(&"EMPTY_TAG_KEY"));
        assert!(codes.contains(&"INVALID_TAG_VALUE_PATTERN"));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.code == "DUPLICATE_TAG_KEY"));
    }

    #[test]
    fn test_empty_required_tags_is_error() {
        let m = matcher(TagMatcherParams::default());
        let report = m.validate_config();
        assert!(report.errors.iter().any(|e| e.code == "NO_REQUIRED_TAGS"));
    }
}
