//! Error types for rollup matching and merging.

use thiserror::Error;

/// Result type alias for rollup operations.
pub type Result<T> = std::result::Result<T, RollupError>;

/// Errors raised by the matcher factory and the merge engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RollupError {
    /// Structurally invalid merge input, rejected before any work
    #[error("Invalid merge input: {0}")]
    InvalidInput(String),

    /// A real metadata conflict hit while `conflict_resolution` is `error`
    #[error("Merge conflict on key '{key}' across nodes {node_ids:?}")]
    Conflict { key: String, node_ids: Vec<String> },

    /// The merged graph would exceed the configured node budget
    #[error("Merge would produce {actual} nodes, exceeding the limit of {limit}")]
    TooManyNodes { actual: usize, limit: usize },

    /// A matcher was constructed from a config of the wrong strategy
    #[error("Matcher configuration mismatch: expected {expected} config, got {actual}")]
    StrategyMismatch { expected: String, actual: String },

    /// A matcher config failed static validation
    #[error("Invalid matcher configuration: {0}")]
    InvalidMatcherConfig(String),
}

impl From<RollupError> for strata_core::StrataError {
    fn from(err: RollupError) -> Self {
        match &err {
            RollupError::InvalidInput(_) | RollupError::TooManyNodes { .. } => {
                Self::merge(err.to_string())
            }
            RollupError::Conflict { .. } => Self::merge(err.to_string()),
            RollupError::StrategyMismatch { .. } | RollupError::InvalidMatcherConfig(_) => {
                Self::matcher_config(err.to_string())
            }
        }
    }
}
