//! Name-based matching with optional fuzzy comparison.

use super::{MatchCandidate, Matcher};
use crate::config::{CommonMatcherConfig, ConfigReport, MatcherConfig, NameMatcherParams};
use crate::error::{Result, RollupError};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use strata_core::{DependencyGraph, GraphNode, MatchResult, MatchStrategy};

/// Metadata key carrying an explicit namespace for key prefixing.
const NAMESPACE_KEY: &str = "namespace";

/// Matches nodes by name, exactly or by normalized Levenshtein similarity.
///
/// Keys are the node name, case-folded unless configured otherwise, optionally
/// prefixed with an extracted namespace (`namespace/name`).
pub struct NameMatcher {
    common: CommonMatcherConfig,
    params: NameMatcherParams,
    pattern: Option<Regex>,
    namespace_pattern: Option<Regex>,
}

impl NameMatcher {
    /// Build from a `Name` config; any other strategy tag is rejected.
    ///
    /// Invalid regexes do not fail construction; they surface through
    /// [`Matcher::validate_config`] so callers get the full itemized report.
    pub fn new(config: MatcherConfig) -> Result<Self> {
        match config {
            MatcherConfig::Name { common, params } => {
                let pattern = params
                    .pattern
                    .as_deref()
                    .and_then(|p| Regex::new(p).ok());
                let namespace_pattern = params
                    .namespace_pattern
                    .as_deref()
                    .and_then(|p| Regex::new(p).ok());
                Ok(Self {
                    common,
                    params,
                    pattern,
                    namespace_pattern,
                })
            }
            other => Err(RollupError::StrategyMismatch {
                expected: "name".to_string(),
                actual: other.strategy().to_string(),
            }),
        }
    }

    /// The namespace prefix for a node, when configured and extractable.
    fn extract_namespace(&self, node: &GraphNode) -> Option<String> {
        if !self.params.include_namespace {
            return None;
        }
        if let Some(namespace) = node.metadata_str(NAMESPACE_KEY) {
            return Some(namespace.to_string());
        }
        self.namespace_pattern
            .as_ref()
            .and_then(|re| re.captures(&node.name))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn build_key(&self, node: &GraphNode) -> String {
        let name = if self.params.case_sensitive {
            node.name.clone()
        } else {
            node.name.to_lowercase()
        };

        match self.extract_namespace(node) {
            Some(namespace) => {
                let namespace = if self.params.case_sensitive {
                    namespace
                } else {
                    namespace.to_lowercase()
                };
                format!("{namespace}/{name}")
            }
            None => name,
        }
    }
}

impl Matcher for NameMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Name
    }

    fn can_handle(&self, node: &GraphNode) -> bool {
        if node.name.trim().is_empty() {
            return false;
        }
        match (&self.params.pattern, &self.pattern) {
            // A configured but unparseable pattern handles nothing.
            (Some(_), None) => false,
            (Some(_), Some(re)) => re.is_match(&node.name),
            (None, _) => true,
        }
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
            candidates.push(MatchCandidate {
                node: node.clone(),
                match_key: self.build_key(node),
                repository_id: repository_id.to_string(),
                scan_id: scan_id.to_string(),
                attributes: HashMap::new(),
            });
        }
        candidates
    }

    fn compare(&self, a: &MatchCandidate, b: &MatchCandidate) -> Option<MatchResult> {
        let (confidence, similarity) = if a.match_key == b.match_key {
            let confidence = if a.node.node_type == b.node.node_type {
                100
            } else {
                95
            };
            (confidence, 100)
        } else {
            let threshold = self.params.fuzzy_threshold?;
            // The threshold gates on the exact similarity; rounding happens
            // only for the reported confidence.
            let similarity = similarity_percent(&a.match_key, &b.match_key);
            if similarity < f64::from(threshold) {
                return None;
            }
            let rounded = (similarity.round() as u32).min(100);
            (rounded as u8, rounded)
        };

        let mut details = HashMap::new();
        details.insert("match_key".to_string(), Value::String(a.match_key.clone()));
        details.insert("similarity".to_string(), Value::from(similarity));

        Some(MatchResult {
            source_repository_id: a.repository_id.clone(),
            source_node_id: a.node.id.clone(),
            target_repository_id: b.repository_id.clone(),
            target_node_id: b.node.id.clone(),
            strategy: MatchStrategy::Name,
            confidence,
            details,
        })
    }

    fn validate_config(&self) -> ConfigReport {
        let mut report = ConfigReport::new();

        if let Some(pattern) = &self.params.pattern {
            if let Err(e) = Regex::new(pattern) {
                report.error("INVALID_NAME_PATTERN", "pattern", e.to_string());
            }
        }
        if let Some(pattern) = &self.params.namespace_pattern {
            if let Err(e) = Regex::new(pattern) {
                report.error("INVALID_NAMESPACE_PATTERN", "namespace_pattern", e.to_string());
            }
        }
        if let Some(threshold) = self.params.fuzzy_threshold {
            if threshold > 100 {
                report.error(
                    "INVALID_FUZZY_THRESHOLD",
                    "fuzzy_threshold",
                    format!("must be within 0..=100, got {threshold}"),
                );
            } else if threshold < 60 {
                report.warning(
                    "LOW_FUZZY_THRESHOLD",
                    "fuzzy_threshold",
                    format!("threshold {threshold} will match loosely related names"),
                );
            }
        }
        if self.params.pattern.is_none() && !self.params.case_sensitive {
            report.warning(
                "UNCONSTRAINED_NAME_MATCHING",
                "pattern",
                "case-insensitive matching without a pattern may over-match common names",
            );
        }

        report
    }

    fn min_confidence(&self) -> u8 {
        self.common.min_confidence
    }
}

/// Normalized Levenshtein similarity as an exact percentage:
/// `(1 - distance/max_len) * 100`.
fn similarity_percent(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let max_len = a_chars.len().max(b_chars.len());
    if max_len == 0 {
        return 100.0;
    }
    let distance = levenshtein(&a_chars, &b_chars);
    (1.0 - (distance as f64 / max_len as f64)) * 100.0
}

/// Classic two-row Levenshtein edit distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{NodeType, SourceLocation};

    fn matcher(params: NameMatcherParams) -> NameMatcher {
        NameMatcher::new(MatcherConfig::Name {
            common: CommonMatcherConfig::default(),
            params,
        })
        .unwrap()
    }

    fn named(id: &str, name: &str) -> GraphNode {
        GraphNode::new(
            id,
            NodeType::TerraformResource,
            name,
            SourceLocation::new("main.tf", 1, 5),
        )
    }

    fn candidate(m: &NameMatcher, node: GraphNode, repo: &str) -> MatchCandidate {
        let mut graph = DependencyGraph::new();
        graph.add_node(node);
        m.extract_candidates(&graph, repo, "scan-1").pop().unwrap()
    }

    #[test]
    fn test_levenshtein() {
        let to_chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&to_chars("kitten"), &to_chars("sitting")), 3);
        assert_eq!(levenshtein(&to_chars("abc"), &to_chars("abc")), 0);
        assert_eq!(levenshtein(&to_chars(""), &to_chars("abc")), 3);
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let m = matcher(NameMatcherParams::default());
        let a = candidate(&m, named("a", "Web-Server"), "repo-a");
        let b = candidate(&m, named("b", "web-server"), "repo-b");

        let result = m.compare(&a, &b).unwrap();
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn test_fuzzy_match_above_threshold() {
        let m = matcher(NameMatcherParams {
            fuzzy_threshold: Some(70),
            ..Default::default()
        });
        // Distance 1 over length 15: similarity 93%.
        let a = candidate(&m, named("a", "web-server-prod"), "repo-a");
        let b = candidate(&m, named("b", "web-server-prd"), "repo-b");

        let result = m.compare(&a, &b).unwrap();
        assert_eq!(result.confidence, 93);
    }

    #[test]
    fn test_no_fuzzy_without_threshold() {
        let m = matcher(NameMatcherParams::default());
        let a = candidate(&m, named("a", "web-server-prod"), "repo-a");
        let b = candidate(&m, named("b", "web-server-prd"), "repo-b");
        assert!(m.compare(&a, &b).is_none());
    }

    #[test]
    fn test_fuzzy_threshold_gates_on_exact_similarity() {
        // Distance 1 over length 14: similarity 92.857%, which rounds to 93.
        // A threshold of 93 must still reject the pair; rounding applies only
        // to the reported confidence.
        let strict = matcher(NameMatcherParams {
            fuzzy_threshold: Some(93),
            ..Default::default()
        });
        let a = candidate(&strict, named("a", "web-server-prd"), "repo-a");
        let b = candidate(&strict, named("b", "web-server-prx"), "repo-b");
        assert!(strict.compare(&a, &b).is_none());

        let lenient = matcher(NameMatcherParams {
            fuzzy_threshold: Some(92),
            ..Default::default()
        });
        let a = candidate(&lenient, named("a", "web-server-prd"), "repo-a");
        let b = candidate(&lenient, named("b", "web-server-prx"), "repo-b");
        assert_eq!(lenient.compare(&a, &b).unwrap().confidence, 93);
    }

    #[test]
    fn test_fuzzy_below_threshold_is_none() {
        let m = matcher(NameMatcherParams {
            fuzzy_threshold: Some(90),
            ..Default::default()
        });
        let a = candidate(&m, named("a", "frontend"), "repo-a");
        let b = candidate(&m, named("b", "backend"), "repo-b");
        assert!(m.compare(&a, &b).is_none());
    }

    #[test]
    fn test_namespace_prefixed_keys() {
        let m = matcher(NameMatcherParams {
            include_namespace: true,
            ..Default::default()
        });
        let node = named("a", "api").with_metadata("namespace", Value::String("Prod".into()));
        let c = candidate(&m, node, "repo-a");
        assert_eq!(c.match_key, "prod/api");
    }

    #[test]
    fn test_pattern_filters_candidates() {
        let m = matcher(NameMatcherParams {
            pattern: Some("^svc-".to_string()),
            ..Default::default()
        });
        assert!(m.can_handle(&named("a", "svc-api")));
        assert!(!m.can_handle(&named("b", "job-api")));
    }

    #[test]
    fn test_validation_reports() {
        let m = matcher(NameMatcherParams {
            pattern: Some("(unclosed".to_string()),
            fuzzy_threshold: Some(40),
            ..Default::default()
        });
        let report = m.validate_config();
        assert!(report.has_errors());
        assert!(report.errors.iter().any(|e| e.code == "INVALID_NAME_PATTERN"));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.code == "LOW_FUZZY_THRESHOLD"));
    }
}
