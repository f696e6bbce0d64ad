//! Version retention (GC)
//!
//! Bounds storage growth by pruning each alias's version chain down to the
//! `N` newest versions. Each pruned version is removed as a unit: payload
//! and sidecar together. Runs independently of reconciliation and is safe
//! to repeat; a chain already at or under the bound is untouched.

use tracing::{debug, info, warn};

use vaultkeep_core::domain::version::RemoteInventory;
use vaultkeep_core::ports::object_store::IObjectStore;

use crate::SyncError;

/// Result of one GC run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GcReport {
    /// Number of distinct aliases seen in the listing
    pub chains_total: usize,
    /// Number of chains that had versions pruned
    pub chains_pruned: usize,
    /// Number of versions removed (payload + sidecar pairs)
    pub versions_removed: usize,
}

/// Prunes version chains down to a fixed number of newest versions
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    keep: usize,
}

impl RetentionPolicy {
    /// Create a policy retaining `keep` versions per alias
    ///
    /// # Errors
    /// A zero bound would delete every version of every file, so it is
    /// rejected as a configuration error.
    pub fn new(keep: usize) -> Result<Self, SyncError> {
        if keep == 0 {
            return Err(SyncError::Configuration(
                "retention.keep_versions must be at least 1".to_string(),
            ));
        }
        Ok(Self { keep })
    }

    /// Number of versions retained per alias
    #[must_use]
    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Run one GC pass over the store's full listing
    ///
    /// Failures are isolated per alias: a chain whose removal fails is
    /// logged and left for the next run.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, store: &dyn IObjectStore) -> Result<GcReport, SyncError> {
        let entries = store
            .list(None, None)
            .await
            .map_err(|e| SyncError::Transient {
                operation: "store list",
                message: format!("{e:#}"),
            })?;
        let inventory = RemoteInventory::build(entries.iter().map(|e| e.key.as_str()));

        let mut report = GcReport {
            chains_total: inventory.len(),
            ..GcReport::default()
        };

        for (alias, chain) in inventory.iter() {
            if chain.len() <= self.keep {
                continue;
            }

            // Chains are sorted newest first; everything past `keep` goes.
            let doomed: Vec<String> = chain[self.keep..]
                .iter()
                .flat_map(|v| [v.payload_key.clone(), v.sidecar_key.clone()])
                .collect();
            let versions = doomed.len() / 2;

            debug!(%alias, versions, "pruning chain");
            if let Err(e) = store.remove(&doomed).await {
                warn!(%alias, error = %e, "chain prune failed, will retry next run");
                continue;
            }
            report.chains_pruned += 1;
            report.versions_removed += versions;
        }

        info!(
            chains = report.chains_total,
            pruned = report.chains_pruned,
            removed = report.versions_removed,
            keep = self.keep,
            "retention pass complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultkeep_core::domain::newtypes::{Alias, SequenceTag};
    use vaultkeep_core::domain::version::{payload_key, sidecar_key_for};
    use vaultkeep_store::MemoryObjectStore;

    async fn seed(store: &MemoryObjectStore, alias: &str, tags: &[i64]) {
        let alias = Alias::new(alias).unwrap();
        for &t in tags {
            let key = payload_key(&alias, SequenceTag::from_millis(t).unwrap(), "md");
            store.upload(&key, b"payload").await.unwrap();
            store.upload(&sidecar_key_for(&key), b"{}").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_prunes_to_newest_n() {
        let store = MemoryObjectStore::new();
        seed(&store, "a-00000000", &[10, 20, 30, 40, 50]).await;

        let report = RetentionPolicy::new(3).unwrap().run(&store).await.unwrap();
        assert_eq!(report.chains_pruned, 1);
        assert_eq!(report.versions_removed, 2);

        // The three newest survive, payload and sidecar both
        for t in [30, 40, 50] {
            assert!(store.contains(&format!("a-00000000__{t}.md")));
            assert!(store.contains(&format!("a-00000000__{t}.md.meta.json")));
        }
        for t in [10, 20] {
            assert!(!store.contains(&format!("a-00000000__{t}.md")));
            assert!(!store.contains(&format!("a-00000000__{t}.md.meta.json")));
        }
    }

    #[tokio::test]
    async fn test_short_chain_untouched() {
        let store = MemoryObjectStore::new();
        seed(&store, "a-00000000", &[10, 20]).await;

        let report = RetentionPolicy::new(3).unwrap().run(&store).await.unwrap();
        assert_eq!(report.chains_total, 1);
        assert_eq!(report.chains_pruned, 0);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let store = MemoryObjectStore::new();
        seed(&store, "a-00000000", &[1, 2, 3, 4]).await;

        let policy = RetentionPolicy::new(2).unwrap();
        let first = policy.run(&store).await.unwrap();
        assert_eq!(first.versions_removed, 2);

        let second = policy.run(&store).await.unwrap();
        assert_eq!(second.versions_removed, 0);
        assert_eq!(store.len(), 4); // 2 versions x (payload + sidecar)
    }

    #[tokio::test]
    async fn test_multiple_chains_independent() {
        let store = MemoryObjectStore::new();
        seed(&store, "a-00000000", &[1, 2, 3]).await;
        seed(&store, "b-11111111", &[1]).await;

        let report = RetentionPolicy::new(1).unwrap().run(&store).await.unwrap();
        assert_eq!(report.chains_total, 2);
        assert_eq!(report.chains_pruned, 1);
        assert_eq!(report.versions_removed, 2);
        assert!(store.contains("a-00000000__3.md"));
        assert!(store.contains("b-11111111__1.md"));
    }

    #[tokio::test]
    async fn test_foreign_keys_ignored() {
        let store = MemoryObjectStore::new();
        store.upload("not-a-version-key", b"x").await.unwrap();
        seed(&store, "a-00000000", &[1, 2]).await;

        let report = RetentionPolicy::new(1).unwrap().run(&store).await.unwrap();
        assert_eq!(report.versions_removed, 1);
        assert!(store.contains("not-a-version-key"));
    }

    #[test]
    fn test_zero_keep_rejected() {
        assert!(matches!(
            RetentionPolicy::new(0),
            Err(SyncError::Configuration(_))
        ));
    }
}
