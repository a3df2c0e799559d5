//! Matcher configuration.
//!
//! Each strategy has its own variant in the closed [`MatcherConfig`] union, so
//! the factory's dispatch is exhaustive and adding a strategy is a
//! compile-time-checked change.

use serde::{Deserialize, Serialize};
use strata_core::MatchStrategy;

/// Fields shared by every matcher strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommonMatcherConfig {
    pub enabled: bool,
    /// Lower values run first when multiple matchers feed one rollup
    pub priority: u32,
    /// Results below this confidence are discarded, 0-100
    pub min_confidence: u8,
}

impl Default for CommonMatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 100,
            min_confidence: 70,
        }
    }
}

/// How a tag set must satisfy the required tags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TagMatchMode {
    /// Every required tag must be present and satisfied
    #[default]
    All,
    /// At least one required tag must be present and satisfied
    Any,
}

/// One required tag constraint for the tag matcher.
///
/// A tag with neither `value` nor `value_pattern` accepts any value; the
/// node's actual value still flows into the match key, so nodes only group
/// when their values agree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequiredTag {
    pub key: String,
    /// Exact value constraint
    #[serde(default)]
    pub value: Option<String>,
    /// Regex value constraint
    #[serde(default)]
    pub value_pattern: Option<String>,
}

impl RequiredTag {
    /// Require only the key, accepting any value
    pub fn key_only(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            value_pattern: None,
        }
    }

    /// Require an exact value
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            value_pattern: None,
        }
    }
}

/// Parameters for the tag matcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TagMatcherParams {
    pub required_tags: Vec<RequiredTag>,
    pub match_mode: TagMatchMode,
    /// Tag keys excluded from both matching and key construction
    pub ignore_tags: Vec<String>,
}

/// Parameters for the name matcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NameMatcherParams {
    /// Regex a node name must match to be considered
    pub pattern: Option<String>,
    pub case_sensitive: bool,
    /// Normalized Levenshtein similarity threshold, 0-100; absent disables
    /// fuzzy matching
    pub fuzzy_threshold: Option<u8>,
    /// Prefix keys with an extracted namespace (`namespace/name`)
    pub include_namespace: bool,
    /// Regex whose first capture extracts a namespace from the node name
    pub namespace_pattern: Option<String>,
}

impl Default for NameMatcherParams {
    fn default() -> Self {
        Self {
            pattern: None,
            case_sensitive: false,
            fuzzy_threshold: None,
            include_namespace: false,
            namespace_pattern: None,
        }
    }
}

/// Tagged union over the four matcher strategies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatcherConfig {
    Arn {
        #[serde(flatten)]
        common: CommonMatcherConfig,
    },
    ResourceId {
        #[serde(flatten)]
        common: CommonMatcherConfig,
    },
    Name {
        #[serde(flatten)]
        common: CommonMatcherConfig,
        #[serde(flatten)]
        params: NameMatcherParams,
    },
    Tag {
        #[serde(flatten)]
        common: CommonMatcherConfig,
        #[serde(flatten)]
        params: TagMatcherParams,
    },
}

impl MatcherConfig {
    /// The strategy this config selects
    pub fn strategy(&self) -> MatchStrategy {
        match self {
            Self::Arn { .. } => MatchStrategy::Arn,
            Self::ResourceId { .. } => MatchStrategy::ResourceId,
            Self::Name { .. } => MatchStrategy::Name,
            Self::Tag { .. } => MatchStrategy::Tag,
        }
    }

    /// The common fields regardless of strategy
    pub fn common(&self) -> &CommonMatcherConfig {
        match self {
            Self::Arn { common }
            | Self::ResourceId { common }
            | Self::Name { common, .. }
            | Self::Tag { common, .. } => common,
        }
    }
}

/// One static validation finding for a matcher config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigIssue {
    /// Stable machine-readable code
    pub code: String,
    /// Path of the offending field
    pub path: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Itemized outcome of validating a matcher config, suitable for direct
/// display in a configuration UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigReport {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ConfigReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(
        &mut self,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(ConfigIssue::new(code, path, message));
    }

    pub fn warning(
        &mut self,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.warnings.push(ConfigIssue::new(code, path, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
