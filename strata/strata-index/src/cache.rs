//! Tiered caching for external-object lookups.
//!
//! L1 is an in-process moka cache with LRU eviction and a short TTL. L2 is a
//! shared cache behind the [`SharedCache`] trait, typically remote, with a
//! longer TTL. The durable store is the authoritative third tier and lives
//! behind [`strata_core::traits::ExternalObjectStore`]; this type never talks
//! to it.
//!
//! L2 failures degrade: they are logged and treated as misses, never surfaced
//! to callers.

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_core::config::CacheConfig;
use strata_core::traits::SharedCache;
use strata_core::types::ExternalObjectEntry;
use tracing::{debug, warn};

/// Prefix shared by every cache key the index writes
pub const KEY_PREFIX: &str = "eoi";

/// Snapshot of cache tier counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub l1_hits: u64,
    pub l1_misses: u64,
    pub l2_hits: u64,
    pub l2_misses: u64,
    /// Current L1 entry count (approximate under concurrent writes)
    pub l1_entries: u64,
}

impl CacheStats {
    /// Fraction of lookups answered by either cache tier
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.l1_hits + self.l2_hits;
        let total = self.l1_hits + self.l1_misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Two-tier read-through cache for external-object lookup results.
pub struct ExternalObjectCache {
    l1: Cache<String, Arc<Vec<ExternalObjectEntry>>>,
    l2: Arc<dyn SharedCache>,
    l2_ttl: Duration,
    l1_hits: AtomicU64,
    l1_misses: AtomicU64,
    l2_hits: AtomicU64,
    l2_misses: AtomicU64,
}

impl ExternalObjectCache {
    pub fn new(config: &CacheConfig, l2: Arc<dyn SharedCache>) -> Self {
        let l1 = Cache::builder()
            .max_capacity(config.l1_capacity)
            .time_to_live(Duration::from_secs(config.l1_ttl_secs))
            .eviction_policy(EvictionPolicy::lru())
            .support_invalidation_closures()
            .build();

        Self {
            l1,
            l2,
            l2_ttl: Duration::from_secs(config.l2_ttl_secs),
            l1_hits: AtomicU64::new(0),
            l1_misses: AtomicU64::new(0),
            l2_hits: AtomicU64::new(0),
            l2_misses: AtomicU64::new(0),
        }
    }

    /// Fetch entries for a key, trying L1 then L2. An L2 hit repopulates L1.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<ExternalObjectEntry>>> {
        if let Some(entries) = self.l1.get(key).await {
            self.l1_hits.fetch_add(1, Ordering::Relaxed);
            return Some(entries);
        }
        self.l1_misses.fetch_add(1, Ordering::Relaxed);

        match self.l2.get(key).await {
            Ok(Some(entries)) => {
                self.l2_hits.fetch_add(1, Ordering::Relaxed);
                let entries = Arc::new(entries);
                self.l1.insert(key.to_string(), entries.clone()).await;
                Some(entries)
            }
            Ok(None) => {
                self.l2_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!("Shared cache get failed for {}: {}", key, e);
                self.l2_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store entries in both tiers
    pub async fn set(&self, key: &str, entries: Vec<ExternalObjectEntry>) {
        if let Err(e) = self.l2.set(key, &entries, self.l2_ttl).await {
            warn!("Shared cache set failed for {}: {}", key, e);
        }
        self.l1.insert(key.to_string(), Arc::new(entries)).await;
    }

    /// Remove a single key from both tiers
    pub async fn delete(&self, key: &str) {
        self.l1.invalidate(key).await;
        if let Err(e) = self.l2.delete(key).await {
            warn!("Shared cache delete failed for {}: {}", key, e);
        }
    }

    /// Remove every key starting with `prefix` from both tiers, returning the
    /// number of shared-cache keys removed
    pub async fn delete_by_prefix(&self, prefix: &str) -> u64 {
        let owned = prefix.to_string();
        if let Err(e) = self
            .l1
            .invalidate_entries_if(move |key, _| key.starts_with(&owned))
        {
            warn!("L1 prefix invalidation failed for {}: {}", prefix, e);
        }
        match self.l2.delete_by_prefix(prefix).await {
            Ok(removed) => {
                debug!("Purged {} shared cache keys under {}", removed, prefix);
                removed
            }
            Err(e) => {
                warn!("Shared cache prefix delete failed for {}: {}", prefix, e);
                0
            }
        }
    }

    /// Drop every cached entry for a tenant
    pub async fn invalidate_tenant(&self, tenant_id: &str) {
        self.delete_by_prefix(&tenant_prefix(tenant_id)).await;
    }

    /// Current counter snapshot
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l1_misses: self.l1_misses.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            l2_misses: self.l2_misses.load(Ordering::Relaxed),
            l1_entries: self.l1.entry_count(),
        }
    }
}

/// Prefix covering every key for one tenant
pub fn tenant_prefix(tenant_id: &str) -> String {
    format!("{KEY_PREFIX}:{tenant_id}:")
}

/// Prefix covering every key form for one normalized id, scoped or not
pub fn id_prefix(tenant_id: &str, normalized_id: &str) -> String {
    format!("{KEY_PREFIX}:{tenant_id}:{normalized_id}")
}

/// Build the cache key for a forward lookup.
///
/// Narrowing fields append `|`-separated segments after the normalized id, so
/// scoped and unscoped lookups of the same id share the [`id_prefix`] and die
/// together on invalidation.
pub fn lookup_key(
    tenant_id: &str,
    normalized_id: &str,
    repository_id: Option<&str>,
    reference_type: Option<&str>,
) -> String {
    let mut key = id_prefix(tenant_id, normalized_id);
    if let Some(repo) = repository_id {
        key.push_str("|repo=");
        key.push_str(repo);
    }
    if let Some(kind) = reference_type {
        key.push_str("|type=");
        key.push_str(kind);
    }
    key
}
