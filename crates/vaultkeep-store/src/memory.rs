//! In-memory object store adapter
//!
//! Backed by a [`DashMap`] so concurrent per-alias operations within one
//! reconciliation pass never contend on a global lock. This is the standard
//! test double across the workspace and doubles as a demo backend.

use dashmap::DashMap;
use tracing::debug;

use vaultkeep_core::ports::object_store::{IObjectStore, ObjectEntry};

/// Concurrent in-memory implementation of [`IObjectStore`]
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects (payloads and sidecars both count)
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Test helper: whether `key` currently exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }
}

#[async_trait::async_trait]
impl IObjectStore for MemoryObjectStore {
    async fn list(
        &self,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<ObjectEntry>> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| prefix.map_or(true, |p| key.starts_with(p)))
            .collect();
        // DashMap iteration order is arbitrary; sort for a stable listing.
        keys.sort();
        if let Some(limit) = limit {
            keys.truncate(limit);
        }
        Ok(keys.into_iter().map(|key| ObjectEntry { key }).collect())
    }

    async fn upload(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        debug!(key, bytes = data.len(), "memory upload");
        self.objects.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn download(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn remove(&self, keys: &[String]) -> anyhow::Result<()> {
        for key in keys {
            self.objects.remove(key);
        }
        Ok(())
    }

    async fn rename(&self, old_key: &str, new_key: &str) -> anyhow::Result<()> {
        match self.objects.remove(old_key) {
            Some((_, value)) => {
                self.objects.insert(new_key.to_string(), value);
                Ok(())
            }
            None => anyhow::bail!("rename source not found: {old_key}"),
        }
    }
}
