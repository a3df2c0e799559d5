//! Error types for reference validation.
//!
//! Validation failures are returned as values, never panics, and carry a
//! stable machine-readable code plus the offending input so callers can
//! surface them directly in configuration UIs or diagnostics.

use thiserror::Error;

/// Result type alias for validation operations.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// A reference validation failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Input is empty or whitespace-only")]
    EmptyInput,

    #[error("Invalid ARN '{value}': {reason}")]
    InvalidArn { value: String, reason: String },

    #[error("Invalid container image reference '{value}': {reason}")]
    InvalidImage { value: String, reason: String },

    #[error("Invalid Git URL '{value}': {reason}")]
    InvalidGitUrl { value: String, reason: String },

    #[error("Invalid storage path '{value}': {reason}")]
    InvalidStoragePath { value: String, reason: String },

    #[error("Invalid Kubernetes reference '{value}': {reason}")]
    InvalidK8sReference { value: String, reason: String },

    #[error("Invalid confidence value {value}: {reason}")]
    InvalidConfidence { value: String, reason: String },
}

impl ValidationError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "EMPTY_INPUT",
            Self::InvalidArn { .. } => "INVALID_ARN",
            Self::InvalidImage { .. } => "INVALID_IMAGE_REFERENCE",
            Self::InvalidGitUrl { .. } => "INVALID_GIT_URL",
            Self::InvalidStoragePath { .. } => "INVALID_STORAGE_PATH",
            Self::InvalidK8sReference { .. } => "INVALID_K8S_REFERENCE",
            Self::InvalidConfidence { .. } => "INVALID_CONFIDENCE",
        }
    }

    /// The offending input value, when one was captured
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::EmptyInput => None,
            Self::InvalidArn { value, .. }
            | Self::InvalidImage { value, .. }
            | Self::InvalidGitUrl { value, .. }
            | Self::InvalidStoragePath { value, .. }
            | Self::InvalidK8sReference { value, .. }
            | Self::InvalidConfidence { value, .. } => Some(value),
        }
    }
}
