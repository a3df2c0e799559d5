//! Core traits defining interfaces for Strata components.

use crate::error::Result;
use crate::types::*;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for components that hand in scanned dependency graphs.
///
/// Graph production (parsers, detectors, scan scheduling) lives outside this
/// core; the rollup and index engines only consume the finished graphs.
#[async_trait]
pub trait GraphProvider: Send + Sync {
    /// Load the latest scanned graph for a repository
    async fn load_graph(&self, tenant_id: &str, repository_id: &str) -> Result<RepositoryGraph>;

    /// List repository ids with a completed scan for a tenant
    async fn list_repositories(&self, tenant_id: &str) -> Result<Vec<String>>;
}

/// Trait for the durable external-object store (the L3 tier).
///
/// The store is authoritative; cache tiers hold derived copies. Retry and
/// timeout policy belongs to implementations, not to callers.
#[async_trait]
pub trait ExternalObjectStore: Send + Sync {
    /// Persist a batch of index entries
    async fn put_batch(&self, entries: &[ExternalObjectEntry]) -> Result<()>;

    /// Fetch entries by normalized external id, optionally narrowed by filter
    async fn get_by_external_id(
        &self,
        tenant_id: &str,
        normalized_id: &str,
        filter: &LookupFilter,
    ) -> Result<Vec<ExternalObjectEntry>>;

    /// Fetch entries carried by one graph node in one scan
    async fn get_by_node(
        &self,
        tenant_id: &str,
        node_id: &str,
        scan_id: &str,
    ) -> Result<Vec<ExternalObjectEntry>>;

    /// Delete entries in the filter's scope, returning the removed rows so the
    /// caller can purge derived cache keys
    async fn delete_where(
        &self,
        tenant_id: &str,
        filter: &InvalidationFilter,
    ) -> Result<Vec<ExternalObjectEntry>>;
}

/// Trait for the shared cache tier (L2).
///
/// Implementations may be remote; errors are expected and callers degrade to
/// the next tier rather than failing the lookup.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Fetch cached entries for a key
    async fn get(&self, key: &str) -> Result<Option<Vec<ExternalObjectEntry>>>;

    /// Store entries under a key with a time-to-live
    async fn set(&self, key: &str, entries: &[ExternalObjectEntry], ttl: Duration) -> Result<()>;

    /// Remove a single key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove all keys with the given prefix, returning the number removed
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64>;
}
