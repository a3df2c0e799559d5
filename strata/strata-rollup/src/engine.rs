//! Merge Engine - groups matched nodes and produces the unified rollup graph.

use crate::error::{Result, RollupError};
use crate::union_find::UnionFind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;
use strata_core::metadata::MetadataBuilder;
use strata_core::{
    GraphEdge, GraphNode, MatchInfo, MatchResult, MergedLocation, MergedNode, RepositoryGraph,
};
use tracing::{debug, info, warn};

/// How divergent metadata values are resolved during a merge.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Take the first source's value (source order = graph input order)
    #[default]
    First,
    /// Take the last source's value
    Last,
    /// Union arrays, shallow-merge objects, fall back to first for primitives
    Merge,
    /// Abort the whole merge on the first real conflict
    Error,
}

/// Options controlling one merge call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeOptions {
    pub conflict_resolution: ConflictResolution,
    /// Upper bound on the number of nodes entering the merge
    pub max_nodes: usize,
    /// Emit edges whose endpoints originate from different repositories
    pub create_cross_repo_edges: bool,
    /// Carry pre-remap endpoint ids and repository ids in edge metadata
    pub preserve_source_info: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictResolution::First,
            max_nodes: 100_000,
            create_cross_repo_edges: true,
            preserve_source_info: false,
        }
    }
}

/// Input to one merge call.
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub graphs: Vec<RepositoryGraph>,
    pub matches: Vec<MatchResult>,
    pub options: MergeOptions,
}

/// A node that belonged to no match group, passed through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnmatchedNode {
    /// Repository-qualified id used as the node's identity in the output
    pub id: String,
    pub repository_id: String,
    pub scan_id: String,
    pub node: GraphNode,
}

/// Counters describing one merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergeStats {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub edges_before: usize,
    pub edges_after: usize,
    pub merged_node_count: usize,
    pub unmatched_node_count: usize,
    /// Tallied even when cross-repo edges are not emitted
    pub cross_repo_edges: usize,
    pub self_loops_dropped: usize,
    pub duplicate_edges_dropped: usize,
    pub conflicts_encountered: usize,
    pub conflicts_resolved: usize,
    pub duration_ms: u64,
}

/// Result of one merge call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeOutput {
    pub merged_nodes: Vec<MergedNode>,
    pub edges: Vec<GraphEdge>,
    pub unmatched_nodes: Vec<UnmatchedNode>,
    pub stats: MergeStats,
}

/// One flattened node, qualified by its owning graph.
struct FlatNode<'a> {
    graph_index: usize,
    repository_id: &'a str,
    scan_id: &'a str,
    node: &'a GraphNode,
}

/// Engine for merging matched nodes across repository graphs.
///
/// Merging is pure and synchronous: the same input always yields the same
/// output content, and a failed merge leaves nothing partially applied.
#[derive(Debug, Default)]
pub struct MergeEngine;

impl MergeEngine {
    pub fn new() -> Self {
        Self
    }

    /// Reject structurally invalid input before any work happens.
    pub fn validate_input(&self, input: &MergeInput) -> Result<()> {
        if input.graphs.len() < 2 {
            return Err(RollupError::InvalidInput(format!(
                "a rollup merge needs at least 2 graphs, got {}",
                input.graphs.len()
            )));
        }
        for (index, graph) in input.graphs.iter().enumerate() {
            if graph.repository_id.trim().is_empty() {
                return Err(RollupError::InvalidInput(format!(
                    "graph at index {index} has an empty repository_id"
                )));
            }
            if graph.scan_id.trim().is_empty() {
                return Err(RollupError::InvalidInput(format!(
                    "graph at index {index} has an empty scan_id"
                )));
            }
        }
        if input.options.max_nodes == 0 {
            return Err(RollupError::InvalidInput(
                "options.max_nodes must be >= 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for graph in &input.graphs {
            if !seen.insert(&graph.repository_id) {
                warn!(
                    repository_id = %graph.repository_id,
                    "Duplicate repository in merge input"
                );
            }
        }

        Ok(())
    }

    /// Merge the input graphs into a unified rollup graph.
    ///
    /// This is an all-or-nothing operation: any error aborts the whole call
    /// and produces no partial output.
    pub fn merge(&self, input: &MergeInput) -> Result<MergeOutput> {
        let start = Instant::now();
        self.validate_input(input)?;

        info!(
            graphs = input.graphs.len(),
            matches = input.matches.len(),
            "Starting rollup merge"
        );

        let mut stats = MergeStats::default();

        // Flatten all nodes, keyed by repository-qualified id.
        let mut flat: HashMap<String, FlatNode<'_>> = HashMap::new();
        for (graph_index, source) in input.graphs.iter().enumerate() {
            for node in source.graph.nodes.values() {
                flat.insert(
                    qualify(&source.repository_id, &node.id),
                    FlatNode {
                        graph_index,
                        repository_id: &source.repository_id,
                        scan_id: &source.scan_id,
                        node,
                    },
                );
            }
            stats.nodes_before += source.graph.node_count();
            stats.edges_before += source.graph.edge_count();
        }

        if stats.nodes_before > input.options.max_nodes {
            return Err(RollupError::TooManyNodes {
                actual: stats.nodes_before,
                limit: input.options.max_nodes,
            });
        }

        // Union matched nodes into disjoint groups.
        let mut union_find = UnionFind::new();
        for m in &input.matches {
            let source_key = qualify(&m.source_repository_id, &m.source_node_id);
            let target_key = qualify(&m.target_repository_id, &m.target_node_id);
            if !flat.contains_key(&source_key) || !flat.contains_key(&target_key) {
                warn!(
                    source = %source_key,
                    target = %target_key,
                    "Match references a node absent from the input graphs; skipping"
                );
                continue;
            }
            union_find.union(&source_key, &target_key);
        }

        let mut groups: Vec<Vec<String>> = union_find
            .groups()
            .into_values()
            .filter(|members| members.len() >= 2)
            .collect();
        // Deterministic group and member order: graph input order, then id.
        for members in &mut groups {
            members.sort_by_key(|key| member_order(&flat, key));
        }
        groups.sort_by_key(|members| member_order(&flat, &members[0]));

        // Merge each group into one logical node.
        let mut merged_nodes = Vec::with_capacity(groups.len());
        let mut node_mapping: HashMap<String, String> = HashMap::new();
        let mut repo_sets: HashMap<String, Vec<String>> = HashMap::new();

        for (index, members) in groups.iter().enumerate() {
            let merged_id = format!("merged-{index}");
            let merged = merge_group(
                &merged_id,
                members,
                &flat,
                &input.matches,
                input.options.conflict_resolution,
                &mut stats,
            )?;

            for key in members {
                node_mapping.insert(key.clone(), merged_id.clone());
            }
            repo_sets.insert(merged_id.clone(), merged.source_repository_ids.clone());
            merged_nodes.push(merged);
        }

        // Everything outside a group passes through unchanged.
        let mut unmatched_nodes: Vec<UnmatchedNode> = flat
            .iter()
            .filter(|(key, _)| !node_mapping.contains_key(key.as_str()))
            .map(|(key, entry)| UnmatchedNode {
                id: key.clone(),
                repository_id: entry.repository_id.to_string(),
                scan_id: entry.scan_id.to_string(),
                node: entry.node.clone(),
            })
            .collect();
        unmatched_nodes.sort_by_key(|n| member_order(&flat, &n.id));
        for unmatched in &unmatched_nodes {
            repo_sets.insert(unmatched.id.clone(), vec![unmatched.repository_id.clone()]);
        }

        let edges = remap_edges(
            input,
            &node_mapping,
            &repo_sets,
            &mut stats,
        );

        stats.merged_node_count = merged_nodes.len();
        stats.unmatched_node_count = unmatched_nodes.len();
        stats.nodes_after = merged_nodes.len() + unmatched_nodes.len();
        stats.edges_after = edges.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            merged = stats.merged_node_count,
            unmatched = stats.unmatched_node_count,
            edges = stats.edges_after,
            cross_repo = stats.cross_repo_edges,
            duration_ms = stats.duration_ms,
            "Rollup merge complete"
        );

        Ok(MergeOutput {
            merged_nodes,
            edges,
            unmatched_nodes,
            stats,
        })
    }
}

fn qualify(repository_id: &str, node_id: &str) -> String {
    format!("{repository_id}:{node_id}")
}

fn member_order(flat: &HashMap<String, FlatNode<'_>>, key: &str) -> (usize, String) {
    let graph_index = flat.get(key).map_or(usize::MAX, |n| n.graph_index);
    (graph_index, key.to_string())
}

/// Merge one group of >= 2 matched nodes into a single logical node.
fn merge_group(
    merged_id: &str,
    members: &[String],
    flat: &HashMap<String, FlatNode<'_>>,
    matches: &[MatchResult],
    resolution: ConflictResolution,
    stats: &mut MergeStats,
) -> Result<MergedNode> {
    let nodes: Vec<&FlatNode<'_>> = members.iter().map(|key| &flat[key]).collect();
    let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();

    let metadata = merge_metadata(&nodes, resolution, stats).map_err(|mut err| {
        if let RollupError::Conflict { node_ids, .. } = &mut err {
            *node_ids = nodes.iter().map(|n| n.node.id.clone()).collect();
        }
        err
    })?;

    // Most frequent name wins; ties break toward first occurrence.
    let mut name_counts: Vec<(&str, usize)> = Vec::new();
    for entry in &nodes {
        match name_counts.iter_mut().find(|(n, _)| *n == entry.node.name) {
            Some((_, count)) => *count += 1,
            None => name_counts.push((&entry.node.name, 1)),
        }
    }
    let name = name_counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .map(|(n, _)| (*n).to_string())
        .unwrap_or_default();

    // The highest-confidence match inside the group defines the provenance.
    let group_matches: Vec<&MatchResult> = matches
        .iter()
        .filter(|m| {
            member_set.contains(qualify(&m.source_repository_id, &m.source_node_id).as_str())
                && member_set.contains(qualify(&m.target_repository_id, &m.target_node_id).as_str())
        })
        .collect();
    let best = group_matches
        .iter()
        .max_by_key(|m| m.confidence)
        .copied()
        .ok_or_else(|| {
            RollupError::InvalidInput(format!("match group {merged_id} has no backing matches"))
        })?;

    let mut source_repository_ids: Vec<String> = Vec::new();
    for entry in &nodes {
        if !source_repository_ids.iter().any(|r| r == entry.repository_id) {
            source_repository_ids.push(entry.repository_id.to_string());
        }
    }

    debug!(
        merged_id,
        members = nodes.len(),
        strategy = %best.strategy,
        confidence = best.confidence,
        "Merged match group"
    );

    Ok(MergedNode {
        id: merged_id.to_string(),
        source_node_ids: nodes.iter().map(|n| n.node.id.clone()).collect(),
        source_repository_ids,
        node_type: nodes[0].node.node_type,
        name,
        locations: nodes
            .iter()
            .map(|n| MergedLocation {
                repository_id: n.repository_id.to_string(),
                file: n.node.location.file.clone(),
                line_start: n.node.location.line_start,
                line_end: n.node.location.line_end,
            })
            .collect(),
        metadata,
        match_info: MatchInfo {
            strategy: best.strategy,
            confidence: best.confidence,
            match_count: group_matches.len(),
        },
    })
}

/// Merge metadata key-by-key across group members in source order.
fn merge_metadata(
    nodes: &[&FlatNode<'_>],
    resolution: ConflictResolution,
    stats: &mut MergeStats,
) -> Result<HashMap<String, Value>> {
    // Keys in first-seen member order, each member's keys sorted, so the
    // result is independent of hash iteration order.
    let mut keys: Vec<&String> = Vec::new();
    for entry in nodes {
        let mut node_keys: Vec<&String> = entry.node.metadata.keys().collect();
        node_keys.sort();
        for key in node_keys {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut merged = HashMap::new();
    for key in keys {
        let values: Vec<&Value> = nodes
            .iter()
            .filter_map(|n| n.node.metadata.get(key))
            .collect();

        let first = values[0];
        if values.iter().all(|v| *v == first) {
            merged.insert(key.clone(), first.clone());
            continue;
        }

        stats.conflicts_encountered += 1;
        let resolved = match resolution {
            ConflictResolution::First => first.clone(),
            ConflictResolution::Last => values[values.len() - 1].clone(),
            ConflictResolution::Merge => merge_values(&values),
            ConflictResolution::Error => {
                return Err(RollupError::Conflict {
                    key: key.clone(),
                    node_ids: Vec::new(),
                });
            }
        };
        stats.conflicts_resolved += 1;
        merged.insert(key.clone(), resolved);
    }

    Ok(merged)
}

/// The `merge` conflict mode: arrays union, objects shallow-merge
/// left-to-right, anything else falls back to the first value.
fn merge_values(values: &[&Value]) -> Value {
    if values.iter().all(|v| v.is_array()) {
        let mut union: Vec<Value> = Vec::new();
        for items in values.iter().filter_map(|v| v.as_array()) {
            for item in items {
                if !union.contains(item) {
                    union.push(item.clone());
                }
            }
        }
        return Value::Array(union);
    }

    if values.iter().all(|v| v.is_object()) {
        let mut combined: BTreeMap<String, Value> = BTreeMap::new();
        for map in values.iter().filter_map(|v| v.as_object()) {
            for (k, v) in map {
                combined.insert(k.clone(), v.clone());
            }
        }
        return Value::Object(combined.into_iter().collect());
    }

    values[0].clone()
}

/// Translate edge endpoints through the node mapping, dropping self-loops and
/// duplicates, tallying and optionally emitting cross-repository edges.
fn remap_edges(
    input: &MergeInput,
    node_mapping: &HashMap<String, String>,
    repo_sets: &HashMap<String, Vec<String>>,
    stats: &mut MergeStats,
) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    let mut seen: HashSet<(String, String, strata_core::EdgeType)> = HashSet::new();

    for source_graph in &input.graphs {
        let repo = &source_graph.repository_id;
        for edge in &source_graph.graph.edges {
            let source_key = qualify(repo, &edge.source);
            let target_key = qualify(repo, &edge.target);
            let new_source = node_mapping
                .get(&source_key)
                .cloned()
                .unwrap_or(source_key);
            let new_target = node_mapping
                .get(&target_key)
                .cloned()
                .unwrap_or(target_key);

            if new_source == new_target {
                stats.self_loops_dropped += 1;
                continue;
            }

            let dedup_key = (new_source.clone(), new_target.clone(), edge.edge_type);
            if !seen.insert(dedup_key) {
                stats.duplicate_edges_dropped += 1;
                continue;
            }

            let cross_repo = is_cross_repo(&new_source, &new_target, repo_sets);
            if cross_repo {
                stats.cross_repo_edges += 1;
                if !input.options.create_cross_repo_edges {
                    continue;
                }
            }

            let mut remapped = edge.clone();
            remapped.id = format!("{repo}:{}", edge.id);
            remapped.source = new_source;
            remapped.target = new_target;
            if input.options.preserve_source_info {
                remapped.metadata.extend(
                    MetadataBuilder::new()
                        .add("original_source", edge.source.clone())
                        .add("original_target", edge.target.clone())
                        .add("source_repository_id", repo.clone())
                        .add("target_repository_id", repo.clone())
                        .build(),
                );
            }
            edges.push(remapped);
        }
    }

    edges
}

/// An edge is cross-repository when its endpoints' originating repository
/// sets differ; that happens only when at least one endpoint is a merged
/// node spanning repositories.
fn is_cross_repo(
    source: &str,
    target: &str,
    repo_sets: &HashMap<String, Vec<String>>,
) -> bool {
    match (repo_sets.get(source), repo_sets.get(target)) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}
