//! Rollup matching and merge engine for the Strata platform.
//!
//! A rollup combines the dependency graphs of several repositories into one
//! unified cross-repository view. Matcher strategies propose scored identity
//! matches between nodes of different repositories; the merge engine groups
//! matched nodes with union-find, resolves metadata conflicts, and remaps
//! edges, synthesizing cross-repository edges where merges connect graphs.
//!
//! All of it is pure, synchronous, CPU-bound computation over already-loaded
//! graphs: no I/O, deterministic given the same inputs and config.

pub mod config;
pub mod engine;
pub mod error;
pub mod matchers;
pub mod union_find;

pub use config::{
    CommonMatcherConfig, ConfigIssue, ConfigReport, MatcherConfig, NameMatcherParams, RequiredTag,
    TagMatchMode, TagMatcherParams,
};
pub use engine::{
    ConflictResolution, MergeEngine, MergeInput, MergeOptions, MergeOutput, MergeStats,
    UnmatchedNode,
};
pub use error::{Result, RollupError};
pub use matchers::{
    find_matches, ArnMatcher, MatchCandidate, Matcher, MatcherFactory, NameMatcher,
    ResourceIdMatcher, TagMatcher,
};
pub use union_find::UnionFind;
