//! Error types for the Strata system.

/// Result type alias for Strata operations.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Main error type for the Strata system.
#[derive(Debug, thiserror::Error)]
pub enum StrataError {
    /// External reference validation errors
    #[error("Validation error [{code}]: {message}")]
    Validation { code: String, message: String },

    /// Matcher configuration errors
    #[error("Matcher configuration error: {0}")]
    MatcherConfig(String),

    /// Merge engine errors
    #[error("Merge error: {0}")]
    Merge(String),

    /// Index/store errors, preserving the underlying cause
    #[error("Index error: {0}")]
    Index(String),

    /// Durable store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Shared cache tier errors (degradable, never fatal on their own)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapped anyhow errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    /// Create a new validation error with a stable machine-readable code
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a new matcher configuration error
    pub fn matcher_config(msg: impl Into<String>) -> Self {
        Self::MatcherConfig(msg.into())
    }

    /// Create a new merge error
    pub fn merge(msg: impl Into<String>) -> Self {
        Self::Merge(msg.into())
    }

    /// Create a new index error
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a new not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The stable code for validation errors, if this is one
    pub fn validation_code(&self) -> Option<&str> {
        match self {
            Self::Validation { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this is a cache-tier error
    pub fn is_cache(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}
