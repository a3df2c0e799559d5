//! External object index service.
//!
//! Orchestrates the extraction engine, the tiered cache, and the durable
//! store: index builds replace a repository's entries, forward lookups read
//! through the cache tiers, reverse lookups go straight to the store, and
//! invalidation purges both rows and the cache keys derived from them.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use strata_core::config::{CacheConfig, IndexConfig};
use strata_core::error::{Result, StrataError};
use strata_core::traits::{ExternalObjectStore, GraphProvider, SharedCache};
use strata_core::types::{
    ExternalObjectEntry, InvalidationFilter, LookupFilter, RepositoryGraph,
};
use strata_refs::normalize;
use tracing::{debug, info, warn};

use crate::cache::{self, CacheStats, ExternalObjectCache};
use crate::engine::{detect_reference_type, IndexEngine};

/// Outcome of an index build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub entries_created: usize,
    /// References that failed validation and were skipped
    pub invalid_references: usize,
    pub build_time_ms: u64,
}

/// Outcome of a forward lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOutcome {
    pub entries: Vec<ExternalObjectEntry>,
    /// True when either cache tier answered
    pub from_cache: bool,
}

/// Multi-tenant index over external object references.
pub struct ExternalObjectIndexService {
    engine: IndexEngine,
    cache: ExternalObjectCache,
    store: Arc<dyn ExternalObjectStore>,
    config: IndexConfig,
}

impl ExternalObjectIndexService {
    pub fn new(
        store: Arc<dyn ExternalObjectStore>,
        shared_cache: Arc<dyn SharedCache>,
        index_config: IndexConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            engine: IndexEngine::new(),
            cache: ExternalObjectCache::new(cache_config, shared_cache),
            store,
            config: index_config,
        }
    }

    /// Build (or rebuild) the index for a set of repository graphs.
    ///
    /// Each repository's previous entries are deleted first, so a build is a
    /// replacement for the repositories it covers and leaves others alone.
    pub async fn build_index(
        &self,
        tenant_id: &str,
        graphs: &[RepositoryGraph],
    ) -> Result<BuildReport> {
        if tenant_id.is_empty() {
            return Err(StrataError::invalid_input("tenant_id must not be empty"));
        }
        let started = Instant::now();
        let mut report = BuildReport::default();

        for repo in graphs {
            let stale = self
                .store
                .delete_where(
                    tenant_id,
                    &InvalidationFilter {
                        repository_id: Some(repo.repository_id.clone()),
                        ..Default::default()
                    },
                )
                .await?;
            self.purge_cache_for(tenant_id, &stale).await;

            let extraction = self.engine.extract(tenant_id, repo);
            if !extraction.invalid_references.is_empty() {
                warn!(
                    "Skipped {} invalid references in repository {}",
                    extraction.invalid_references.len(),
                    repo.repository_id
                );
            }

            for batch in extraction.entries.chunks(self.config.build_batch_size) {
                self.store.put_batch(batch).await?;
            }
            // Fresh rows may shadow cached results for the same ids.
            self.purge_cache_for(tenant_id, &extraction.entries).await;

            debug!(
                "Indexed repository {}: {} entries replacing {}",
                repo.repository_id,
                extraction.entries.len(),
                stale.len()
            );
            report.entries_created += extraction.entries.len();
            report.invalid_references += extraction.invalid_references.len();
        }

        report.build_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "Index build for tenant {} created {} entries across {} repositories in {}ms",
            tenant_id,
            report.entries_created,
            graphs.len(),
            report.build_time_ms
        );
        Ok(report)
    }

    /// Build the index over every repository a provider knows for a tenant.
    pub async fn build_index_for_tenant(
        &self,
        tenant_id: &str,
        provider: &dyn GraphProvider,
    ) -> Result<BuildReport> {
        let repositories = provider.list_repositories(tenant_id).await?;
        let mut graphs = Vec::with_capacity(repositories.len());
        for repository_id in &repositories {
            graphs.push(provider.load_graph(tenant_id, repository_id).await?);
        }
        self.build_index(tenant_id, &graphs).await
    }

    /// Find every node carrying an external id, reading through the cache.
    ///
    /// The raw id is normalized before lookup, so raw and normalized forms of
    /// the same identifier resolve identically.
    pub async fn lookup_by_external_id(
        &self,
        tenant_id: &str,
        external_id: &str,
        filter: &LookupFilter,
    ) -> Result<LookupOutcome> {
        if external_id.trim().is_empty() {
            return Err(StrataError::invalid_input("external_id must not be empty"));
        }

        let normalized = self.normalize_query(external_id, filter);
        let kind_tag = filter.reference_type.map(|k| k.to_string());
        let key = cache::lookup_key(
            tenant_id,
            &normalized,
            filter.repository_id.as_deref(),
            kind_tag.as_deref(),
        );

        if let Some(entries) = self.cache.get(&key).await {
            debug!("Lookup {} answered from cache", key);
            return Ok(LookupOutcome {
                entries: entries.as_ref().clone(),
                from_cache: true,
            });
        }

        let entries = self
            .store
            .get_by_external_id(tenant_id, &normalized, filter)
            .await?;
        self.cache.set(&key, entries.clone()).await;
        Ok(LookupOutcome {
            entries,
            from_cache: false,
        })
    }

    /// Every external reference one node carried in one scan. Uncached; the
    /// call pattern is diagnostic, not hot-path.
    pub async fn reverse_lookup(
        &self,
        tenant_id: &str,
        node_id: &str,
        scan_id: &str,
    ) -> Result<Vec<ExternalObjectEntry>> {
        self.store.get_by_node(tenant_id, node_id, scan_id).await
    }

    /// Delete entries in the filter's scope and purge derived cache keys.
    ///
    /// An empty filter is rejected rather than interpreted as "everything".
    pub async fn invalidate(
        &self,
        tenant_id: &str,
        filter: &InvalidationFilter,
    ) -> Result<usize> {
        if filter.is_empty() {
            return Err(StrataError::invalid_input(
                "invalidation filter must set at least one field",
            ));
        }

        let removed = self.store.delete_where(tenant_id, filter).await?;
        self.purge_cache_for(tenant_id, &removed).await;
        info!(
            "Invalidated {} index entries for tenant {}",
            removed.len(),
            tenant_id
        );
        Ok(removed.len())
    }

    /// Cache tier counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Purge every cached key form for the normalized ids of a set of entries
    async fn purge_cache_for(&self, tenant_id: &str, entries: &[ExternalObjectEntry]) {
        let ids: BTreeSet<&str> = entries.iter().map(|e| e.normalized_id.as_str()).collect();
        for id in ids {
            self.cache
                .delete_by_prefix(&cache::id_prefix(tenant_id, id))
                .await;
        }
    }

    fn normalize_query(&self, external_id: &str, filter: &LookupFilter) -> String {
        let kind = filter
            .reference_type
            .or_else(|| detect_reference_type(external_id));
        match kind {
            Some(kind) => normalize(kind, external_id),
            None => external_id.trim().to_lowercase(),
        }
    }
}
