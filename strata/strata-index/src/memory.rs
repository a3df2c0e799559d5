//! In-memory store and shared-cache implementations.
//!
//! Process-local stand-ins for the durable store and the remote shared cache,
//! used in tests and single-node deployments. Both are safe to share across
//! tasks.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use strata_core::error::{Result, StrataError};
use strata_core::traits::{ExternalObjectStore, GraphProvider, SharedCache};
use strata_core::types::{
    ExternalObjectEntry, InvalidationFilter, LookupFilter, RepositoryGraph,
};
use tracing::debug;

use crate::mapper::{EntryMapper, ExternalObjectRecord};

/// [`GraphProvider`] serving pre-loaded graphs, keyed by tenant.
#[derive(Debug, Default)]
pub struct InMemoryGraphProvider {
    graphs: DashMap<(String, String), RepositoryGraph>,
}

impl InMemoryGraphProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: &str, graph: RepositoryGraph) {
        self.graphs
            .insert((tenant_id.to_string(), graph.repository_id.clone()), graph);
    }
}

#[async_trait]
impl GraphProvider for InMemoryGraphProvider {
    async fn load_graph(&self, tenant_id: &str, repository_id: &str) -> Result<RepositoryGraph> {
        self.graphs
            .get(&(tenant_id.to_string(), repository_id.to_string()))
            .map(|kv| kv.value().clone())
            .ok_or_else(|| StrataError::not_found("repository graph", repository_id))
    }

    async fn list_repositories(&self, tenant_id: &str) -> Result<Vec<String>> {
        let mut repos: Vec<String> = self
            .graphs
            .iter()
            .filter(|kv| kv.key().0 == tenant_id)
            .map(|kv| kv.key().1.clone())
            .collect();
        repos.sort();
        Ok(repos)
    }
}

/// [`SharedCache`] backed by a concurrent map with per-entry expiry.
#[derive(Debug, Default)]
pub struct InMemorySharedCache {
    entries: DashMap<String, (Vec<ExternalObjectEntry>, Instant)>,
}

impl InMemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SharedCache for InMemorySharedCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<ExternalObjectEntry>>> {
        if let Some(kv) = self.entries.get(key) {
            let (entries, expires_at) = kv.value();
            if Instant::now() < *expires_at {
                return Ok(Some(entries.clone()));
            }
        }
        // Expired entries are dropped on the next read.
        self.entries
            .remove_if(key, |_, (_, expires_at)| Instant::now() >= *expires_at);
        Ok(None)
    }

    async fn set(&self, key: &str, entries: &[ExternalObjectEntry], ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (entries.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - self.entries.len()) as u64)
    }
}

/// [`ExternalObjectStore`] keeping persisted rows in a concurrent map.
///
/// Rows are stored in their serialized record form so the mapper boundary is
/// exercised exactly as it would be against a real database.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    rows: DashMap<String, ExternalObjectRecord>,
    mapper: EntryMapper,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Decode every row for a tenant that passes `keep`
    fn collect<F>(&self, tenant_id: &str, keep: F) -> Result<Vec<ExternalObjectEntry>>
    where
        F: Fn(&ExternalObjectEntry) -> bool,
    {
        let mut entries = Vec::new();
        for row in self.rows.iter() {
            if row.value().tenant_id != tenant_id {
                continue;
            }
            let entry = self.mapper.to_entry(row.value())?;
            if keep(&entry) {
                entries.push(entry);
            }
        }
        // Deterministic output order regardless of map iteration
        entries.sort_by(|a, b| {
            (&a.repository_id, &a.node_id, &a.normalized_id).cmp(&(
                &b.repository_id,
                &b.node_id,
                &b.normalized_id,
            ))
        });
        Ok(entries)
    }
}

#[async_trait]
impl ExternalObjectStore for InMemoryObjectStore {
    async fn put_batch(&self, entries: &[ExternalObjectEntry]) -> Result<()> {
        for entry in entries {
            let record = self.mapper.to_record(entry)?;
            self.rows.insert(record.id.clone(), record);
        }
        debug!("Persisted {} index entries", entries.len());
        Ok(())
    }

    async fn get_by_external_id(
        &self,
        tenant_id: &str,
        normalized_id: &str,
        filter: &LookupFilter,
    ) -> Result<Vec<ExternalObjectEntry>> {
        self.collect(tenant_id, |entry| {
            if entry.normalized_id != normalized_id {
                return false;
            }
            if let Some(repo) = &filter.repository_id {
                if &entry.repository_id != repo {
                    return false;
                }
            }
            if let Some(kind) = &filter.reference_type {
                if &entry.reference_type != kind {
                    return false;
                }
            }
            true
        })
    }

    async fn get_by_node(
        &self,
        tenant_id: &str,
        node_id: &str,
        scan_id: &str,
    ) -> Result<Vec<ExternalObjectEntry>> {
        self.collect(tenant_id, |entry| {
            entry.node_id == node_id && entry.scan_id == scan_id
        })
    }

    async fn delete_where(
        &self,
        tenant_id: &str,
        filter: &InvalidationFilter,
    ) -> Result<Vec<ExternalObjectEntry>> {
        let removed = self.collect(tenant_id, |entry| filter.matches(entry))?;
        for entry in &removed {
            self.rows.remove(&entry.id.to_string());
        }
        debug!("Deleted {} index entries for tenant {}", removed.len(), tenant_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use strata_core::id::StrataId;
    use strata_core::types::{NodeType, ReferenceType};

    fn entry(repo: &str, node: &str, normalized: &str) -> ExternalObjectEntry {
        ExternalObjectEntry {
            id: StrataId::new(),
            external_id: normalized.to_string(),
            reference_type: ReferenceType::Arn,
            normalized_id: normalized.to_string(),
            tenant_id: "t1".to_string(),
            repository_id: repo.to_string(),
            scan_id: format!("scan-{repo}"),
            node_id: node.to_string(),
            node_name: node.to_string(),
            node_type: NodeType::TerraformResource,
            file_path: "main.tf".to_string(),
            components: HashMap::new(),
            metadata: HashMap::new(),
            indexed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_and_forward_lookup() {
        let store = InMemoryObjectStore::new();
        store
            .put_batch(&[
                entry("repo-a", "n1", "arn:aws:s3:::assets"),
                entry("repo-b", "n2", "arn:aws:s3:::assets"),
                entry("repo-a", "n3", "arn:aws:s3:::other"),
            ])
            .await
            .unwrap();

        let all = store
            .get_by_external_id("t1", "arn:aws:s3:::assets", &LookupFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].repository_id, "repo-a");

        let scoped = store
            .get_by_external_id(
                "t1",
                "arn:aws:s3:::assets",
                &LookupFilter {
                    repository_id: Some("repo-b".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].node_id, "n2");
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let store = InMemoryObjectStore::new();
        let mut other_tenant = entry("repo-a", "n1", "arn:aws:s3:::assets");
        other_tenant.tenant_id = "t2".to_string();
        store.put_batch(&[other_tenant]).await.unwrap();

        let entries = store
            .get_by_external_id("t1", "arn:aws:s3:::assets", &LookupFilter::default())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_reverse_lookup_scopes_by_scan() {
        let store = InMemoryObjectStore::new();
        store
            .put_batch(&[entry("repo-a", "n1", "arn:aws:s3:::assets")])
            .await
            .unwrap();

        let hit = store.get_by_node("t1", "n1", "scan-repo-a").await.unwrap();
        assert_eq!(hit.len(), 1);
        let miss = store.get_by_node("t1", "n1", "scan-stale").await.unwrap();
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn test_delete_where_returns_removed_rows() {
        let store = InMemoryObjectStore::new();
        store
            .put_batch(&[
                entry("repo-a", "n1", "arn:aws:s3:::assets"),
                entry("repo-b", "n2", "arn:aws:s3:::assets"),
            ])
            .await
            .unwrap();

        let removed = store
            .delete_where(
                "t1",
                &InvalidationFilter {
                    repository_id: Some("repo-a".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].repository_id, "repo-a");
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn test_shared_cache_expiry() {
        let cache = InMemorySharedCache::new();
        cache
            .set("k", &[entry("repo-a", "n1", "x")], Duration::from_millis(10))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_shared_cache_prefix_delete() {
        let cache = InMemorySharedCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("eoi:t1:a", &[], ttl).await.unwrap();
        cache.set("eoi:t1:b", &[], ttl).await.unwrap();
        cache.set("eoi:t2:a", &[], ttl).await.unwrap();

        let removed = cache.delete_by_prefix("eoi:t1:").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
    }
}
