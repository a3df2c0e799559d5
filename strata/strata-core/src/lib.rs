//! Core types and abstractions for the Strata rollup platform.
//!
//! This crate provides the shared data model (dependency graphs, merged nodes,
//! external object entries), error handling, configuration, and the async trait
//! seams used across all Strata components.

pub mod config;
pub mod error;
pub mod id;
pub mod metadata;
pub mod traits;
pub mod types;

pub use config::{CacheConfig, IndexConfig, RollupConfig, StrataConfig};
pub use error::{Result, StrataError};
pub use id::StrataId;
pub use traits::*;
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CacheConfig, IndexConfig, RollupConfig, StrataConfig};
    pub use crate::error::{Result, StrataError};
    pub use crate::id::StrataId;
    pub use crate::traits::*;
    pub use crate::types::*;
}
