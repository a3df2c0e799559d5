//! Configuration for Strata components.
//!
//! Configuration is loaded from a TOML file, then overridden by environment
//! variables with the `STRATA_` prefix. There is no global singleton; callers
//! load a [`StrataConfig`] once and pass it (or its sections) into the
//! components they construct.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable overriding the config file path
pub const ENV_CONFIG_PATH: &str = "STRATA_CONFIG_PATH";
/// Environment variable overriding the L1 cache capacity
pub const ENV_CACHE_L1_CAPACITY: &str = "STRATA_CACHE_L1_CAPACITY";
/// Environment variable overriding the L1 TTL in seconds
pub const ENV_CACHE_L1_TTL_SECS: &str = "STRATA_CACHE_L1_TTL_SECS";
/// Environment variable overriding the L2 TTL in seconds
pub const ENV_CACHE_L2_TTL_SECS: &str = "STRATA_CACHE_L2_TTL_SECS";

/// Top-level configuration for all Strata components.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrataConfig {
    pub rollup: RollupConfig,
    pub index: IndexConfig,
    pub cache: CacheConfig,
}

/// Rollup merge defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RollupConfig {
    /// Default minimum confidence applied when a matcher config omits one
    pub default_min_confidence: u8,
    /// Upper bound on merged-graph node count
    pub max_nodes: usize,
    /// Emit cross-repository edges by default
    pub create_cross_repo_edges: bool,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            default_min_confidence: 70,
            max_nodes: 100_000,
            create_cross_repo_edges: true,
        }
    }
}

/// External object index defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Batch size for durable-store writes during index builds
    pub build_batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            build_batch_size: 500,
        }
    }
}

/// Cache tier sizing and TTLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of L1 entries
    pub l1_capacity: u64,
    /// L1 time-to-live in seconds
    pub l1_ttl_secs: u64,
    /// L2 time-to-live in seconds
    pub l2_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_capacity: 10_000,
            l1_ttl_secs: 60,
            l2_ttl_secs: 600,
        }
    }
}

impl StrataConfig {
    /// Load configuration from a TOML file, apply env overrides, and validate
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| StrataError::config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Default configuration with env overrides applied
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load(Path::new(&path));
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u64(ENV_CACHE_L1_CAPACITY) {
            debug!("Overriding cache.l1_capacity from environment: {}", v);
            self.cache.l1_capacity = v;
        }
        if let Some(v) = env_u64(ENV_CACHE_L1_TTL_SECS) {
            debug!("Overriding cache.l1_ttl_secs from environment: {}", v);
            self.cache.l1_ttl_secs = v;
        }
        if let Some(v) = env_u64(ENV_CACHE_L2_TTL_SECS) {
            debug!("Overriding cache.l2_ttl_secs from environment: {}", v);
            self.cache.l2_ttl_secs = v;
        }
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.rollup.default_min_confidence > 100 {
            return Err(StrataError::config(
                "rollup.default_min_confidence must be in 0..=100",
            ));
        }
        if self.rollup.max_nodes == 0 {
            return Err(StrataError::config("rollup.max_nodes must be >= 1"));
        }
        if self.index.build_batch_size == 0 {
            return Err(StrataError::config("index.build_batch_size must be >= 1"));
        }
        if self.cache.l1_capacity == 0 {
            return Err(StrataError::config("cache.l1_capacity must be >= 1"));
        }
        if self.cache.l1_ttl_secs == 0 || self.cache.l2_ttl_secs == 0 {
            return Err(StrataError::config("cache TTLs must be >= 1 second"));
        }
        Ok(())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = StrataConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[cache]\nl1_capacity = 500\nl1_ttl_secs = 30\n\n[rollup]\nmax_nodes = 1000"
        )
        .unwrap();

        let config = StrataConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.l1_capacity, 500);
        assert_eq!(config.cache.l1_ttl_secs, 30);
        assert_eq!(config.rollup.max_nodes, 1000);
        // Untouched sections keep their defaults
        assert_eq!(config.index.build_batch_size, 500);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StrataConfig {
            rollup: RollupConfig {
                max_nodes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
