//! Reconciliation engine
//!
//! Computes the full diff between a local vault snapshot and a remote store
//! snapshot, then applies the conflict-as-copy policy:
//!
//! - local only → upload a new version chain
//! - local strictly newer → append a version to the chain
//! - local strictly older → **diverge**: the local content is preserved
//!   under a new path (and alias) and the remote head is materialized at
//!   the original path; neither edit is ever silently discarded
//! - equal tags → no-op
//! - remote only → download, placing the file at the sidecar's original path
//!
//! Sequence tags are taken from local modification times, and downloads are
//! written with their tag as mtime, so a pass over an already-synced vault
//! performs zero transfers.
//!
//! Failure handling is per alias: one alias's failure is recorded as a
//! skipped outcome and never aborts the remaining aliases.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vaultkeep_core::config::Config;
use vaultkeep_core::domain::alias::encode;
use vaultkeep_core::domain::newtypes::{Alias, SequenceTag, VaultPath};
use vaultkeep_core::domain::version::{
    extension_for, payload_key, LocalInventory, RemoteInventory, RemoteVersion, SidecarMetadata,
    VaultFileRecord, SIDECAR_SUFFIX, TAG_SEPARATOR,
};
use vaultkeep_core::ports::local_vault::ILocalVault;
use vaultkeep_core::ports::object_store::IObjectStore;

use crate::namer::DivergenceNamer;
use crate::sidecar::SidecarManager;
use crate::SyncError;

// ============================================================================
// Pass outcomes
// ============================================================================

/// Per-alias result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A new version was appended to (or started) the alias's chain
    Uploaded,
    /// The remote head was materialized locally
    Downloaded,
    /// Conflict-as-copy: the local edit now lives at `copy`
    Diverged {
        /// Vault path holding the preserved local edit
        copy: VaultPath,
    },
    /// The local file was removed, mirroring a remote delete
    Deleted,
    /// Local and remote already agree
    Unchanged,
    /// This alias failed or was not actionable; the pass continued
    Skipped {
        /// Why the alias was skipped
        reason: String,
    },
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemOutcome::Uploaded => write!(f, "uploaded"),
            ItemOutcome::Downloaded => write!(f, "downloaded"),
            ItemOutcome::Diverged { copy } => write!(f, "diverged -> {copy}"),
            ItemOutcome::Deleted => write!(f, "deleted"),
            ItemOutcome::Unchanged => write!(f, "unchanged"),
            ItemOutcome::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Summary of one reconciliation pass
#[derive(Debug, Default)]
pub struct PassReport {
    /// Outcome per alias, in processing order
    pub outcomes: Vec<(Alias, ItemOutcome)>,
    /// Whether the pass stopped early on cancellation
    pub cancelled: bool,
    /// Wall-clock duration of the pass
    pub duration_ms: u64,
}

impl PassReport {
    fn count(&self, matches: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| matches(o)).count()
    }

    /// Number of aliases that uploaded a version
    #[must_use]
    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Uploaded))
    }

    /// Number of aliases materialized locally
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Downloaded))
    }

    /// Number of conflicts resolved as copies
    #[must_use]
    pub fn diverged(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Diverged { .. }))
    }

    /// Number of local files deleted to mirror remote deletes
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Deleted))
    }

    /// Number of aliases already in sync
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Unchanged))
    }

    /// Number of aliases skipped with a reason
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    /// Whether the pass transferred nothing (idempotence check)
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.uploaded() == 0 && self.downloaded() == 0 && self.diverged() == 0
    }
}

// ============================================================================
// ReconcileEngine
// ============================================================================

/// Applies the reconciliation algorithm over injected storage ports
///
/// Passes are serialized: a second `full_sync` call waits for the running
/// pass to finish rather than interleaving with it. Event-driven operations
/// ([`upload_path`](Self::upload_path), [`remove_remote`](Self::remove_remote),
/// [`move_remote`](Self::move_remote)) do not take the pass lock; they are
/// single-key operations that the snapshot model already tolerates.
pub struct ReconcileEngine {
    store: Arc<dyn IObjectStore>,
    vault: Arc<dyn ILocalVault>,
    sidecars: SidecarManager,
    /// Aliases known to have been in sync at some point in this process.
    /// Gates delete mirroring so a fresh pairing never deletes anything.
    synced: Mutex<HashSet<Alias>>,
    pass_guard: Mutex<()>,
    op_timeout: Duration,
    propagate_remote_deletes: bool,
}

impl fmt::Debug for ReconcileEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileEngine")
            .field("op_timeout", &self.op_timeout)
            .field("propagate_remote_deletes", &self.propagate_remote_deletes)
            .finish_non_exhaustive()
    }
}

impl ReconcileEngine {
    /// Create an engine over the given ports
    ///
    /// # Errors
    /// Returns [`SyncError::Configuration`] when the configuration is
    /// invalid; this is checked once here so no pass ever starts on a bad
    /// configuration.
    pub fn new(
        store: Arc<dyn IObjectStore>,
        vault: Arc<dyn ILocalVault>,
        config: &Config,
    ) -> Result<Self, SyncError> {
        let problems = config.validate();
        if !problems.is_empty() {
            let joined = problems
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SyncError::Configuration(joined));
        }

        Ok(Self {
            sidecars: SidecarManager::new(store.clone()),
            store,
            vault,
            synced: Mutex::new(HashSet::new()),
            pass_guard: Mutex::new(()),
            op_timeout: Duration::from_secs(config.sync.operation_timeout_secs),
            propagate_remote_deletes: config.sync.propagate_remote_deletes,
        })
    }

    /// The sidecar manager sharing this engine's store
    #[must_use]
    pub fn sidecars(&self) -> &SidecarManager {
        &self.sidecars
    }

    // ------------------------------------------------------------------
    // Full reconciliation
    // ------------------------------------------------------------------

    /// Run one full reconciliation pass
    ///
    /// Cancellation is cooperative and checked between aliases; a cancelled
    /// pass returns the partial report with `cancelled` set.
    ///
    /// # Errors
    /// Only snapshot failures (enumeration or listing) abort the pass;
    /// per-alias failures become skipped outcomes.
    #[tracing::instrument(skip_all)]
    pub async fn full_sync(&self, cancel: &CancellationToken) -> Result<PassReport, SyncError> {
        let _pass = self.pass_guard.lock().await;
        let started = Instant::now();

        let records = self.op("vault enumerate", self.vault.enumerate()).await?;
        let local = LocalInventory::build(records);
        let remote = self.snapshot_remote().await?;
        debug!(
            local = local.len(),
            remote = remote.len(),
            "snapshots built"
        );

        let mut report = PassReport::default();

        for (alias, record) in local.iter() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = self
                .reconcile_local(alias, record, &remote)
                .await
                .unwrap_or_else(|e| {
                    warn!(%alias, error = %e, "alias failed, continuing pass");
                    ItemOutcome::Skipped {
                        reason: e.to_string(),
                    }
                });
            report.outcomes.push((alias.clone(), outcome));
        }

        if !report.cancelled {
            for (alias, chain) in remote.iter() {
                if local.contains(alias) {
                    continue;
                }
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                let outcome = self.materialize(chain).await.unwrap_or_else(|e| {
                    warn!(%alias, error = %e, "alias failed, continuing pass");
                    ItemOutcome::Skipped {
                        reason: e.to_string(),
                    }
                });
                report.outcomes.push((alias.clone(), outcome));
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            uploaded = report.uploaded(),
            downloaded = report.downloaded(),
            diverged = report.diverged(),
            deleted = report.deleted(),
            unchanged = report.unchanged(),
            skipped = report.skipped(),
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "reconciliation pass complete"
        );
        Ok(report)
    }

    async fn reconcile_local(
        &self,
        alias: &Alias,
        record: &VaultFileRecord,
        remote: &RemoteInventory,
    ) -> Result<ItemOutcome, SyncError> {
        let local_tag = SequenceTag::from_datetime(record.modified);

        match remote.latest(alias) {
            None => {
                if self.propagate_remote_deletes && self.was_synced(alias).await {
                    self.op("vault delete", self.vault.delete(&record.path))
                        .await?;
                    self.forget(alias).await;
                    info!(path = %record.path, "mirrored remote delete locally");
                    Ok(ItemOutcome::Deleted)
                } else {
                    self.push_version(&record.path, local_tag).await?;
                    self.remember(alias).await;
                    Ok(ItemOutcome::Uploaded)
                }
            }
            Some(head) if local_tag == head.sequence_tag => {
                self.remember(alias).await;
                Ok(ItemOutcome::Unchanged)
            }
            Some(head) if local_tag > head.sequence_tag => {
                self.push_version(&record.path, local_tag).await?;
                self.remember(alias).await;
                Ok(ItemOutcome::Uploaded)
            }
            Some(head) => self.diverge(&record.path, local_tag, head).await,
        }
    }

    /// Conflict-as-copy: preserve the older local edit under a new path,
    /// then bring the original path up to the remote head.
    async fn diverge(
        &self,
        path: &VaultPath,
        local_tag: SequenceTag,
        head: &RemoteVersion,
    ) -> Result<ItemOutcome, SyncError> {
        let data = self.read_local(path).await?;

        let copy_path = DivergenceNamer::generate(path);
        let copy_alias = encode(&copy_path);
        let copy = RemoteVersion::compose(&copy_alias, local_tag, &extension_for(&copy_path));

        self.op(
            "payload upload",
            self.store.upload(&copy.payload_key, &data),
        )
        .await?;
        self.sidecars
            .write(
                &copy.payload_key,
                &SidecarMetadata::for_version(&copy_path, local_tag),
            )
            .await?;

        // Keep the preserved edit visible next to the original, stamped with
        // its own tag so the next pass sees it as already synced.
        self.op(
            "vault write",
            self.vault.write(&copy_path, &data, local_tag.to_datetime()),
        )
        .await?;

        let head_bytes = self
            .op("payload download", self.store.download(&head.payload_key))
            .await?
            .ok_or_else(|| SyncError::Transient {
                operation: "payload download",
                message: format!("listed payload is gone: {}", head.payload_key),
            })?;
        self.op(
            "vault write",
            self.vault
                .write(path, &head_bytes, head.sequence_tag.to_datetime()),
        )
        .await?;

        self.remember(&head.alias).await;
        self.remember(&copy_alias).await;
        warn!(%path, copy = %copy_path, "concurrent edits, local version preserved as copy");
        Ok(ItemOutcome::Diverged { copy: copy_path })
    }

    /// Download a remote version and place it at its sidecar's original path
    ///
    /// Prefers the chain head. A head whose sidecar is missing is an orphan
    /// but does not doom the alias: the newest older version with readable
    /// provenance is taken instead. Only when no version in the chain has a
    /// sidecar is the alias skipped.
    async fn materialize(&self, chain: &[RemoteVersion]) -> Result<ItemOutcome, SyncError> {
        let mut chosen = None;
        for candidate in chain {
            match self.sidecars.read(&candidate.payload_key).await {
                Ok(meta) => {
                    chosen = Some((candidate, meta));
                    break;
                }
                Err(SyncError::SidecarMissing(key)) => {
                    debug!(%key, "orphaned payload, trying an older version");
                }
                Err(e) => return Err(e),
            }
        }
        let Some((version, meta)) = chosen else {
            return Err(SyncError::SidecarMissing(
                chain
                    .first()
                    .map_or_else(String::new, |v| v.payload_key.clone()),
            ));
        };

        // A file can already sit at the target path without matching this
        // alias (normalization edge). Never clobber a strictly newer edit.
        if let Some(existing) = self
            .op("vault stat", self.vault.modified_at(&meta.original_path))
            .await?
        {
            if SequenceTag::from_datetime(existing) > version.sequence_tag {
                return Ok(ItemOutcome::Skipped {
                    reason: format!("local file at {} is newer", meta.original_path),
                });
            }
        }

        let data = self
            .op("payload download", self.store.download(&version.payload_key))
            .await?
            .ok_or_else(|| SyncError::Transient {
                operation: "payload download",
                message: format!("listed payload is gone: {}", version.payload_key),
            })?;

        self.op(
            "vault write",
            self.vault
                .write(&meta.original_path, &data, version.sequence_tag.to_datetime()),
        )
        .await?;
        self.remember(&version.alias).await;
        debug!(path = %meta.original_path, tag = %version.sequence_tag, "materialized remote version");
        Ok(ItemOutcome::Downloaded)
    }

    // ------------------------------------------------------------------
    // Event-driven operations (used by change capture)
    // ------------------------------------------------------------------

    /// Upload the current content of `path` as a new version
    ///
    /// The sequence tag is the file's modification time, so repeating the
    /// same upload hits the same key and is idempotent.
    pub async fn upload_path(&self, path: &VaultPath) -> Result<(), SyncError> {
        let modified = self
            .op("vault stat", self.vault.modified_at(path))
            .await?
            .ok_or_else(|| SyncError::LocalFileVanished(path.clone()))?;
        let tag = SequenceTag::from_datetime(modified);

        self.push_version(path, tag).await?;
        self.remember(&encode(path)).await;
        Ok(())
    }

    /// Remove the entire remote chain (payloads and sidecars) for `path`
    pub async fn remove_remote(&self, path: &VaultPath) -> Result<(), SyncError> {
        let alias = encode(path);
        let keys = self.chain_keys(&alias).await?;
        if !keys.is_empty() {
            self.op("store remove", self.store.remove(&keys)).await?;
        }
        self.forget(&alias).await;
        info!(%path, removed = keys.len(), "removed remote chain");
        Ok(())
    }

    /// Move every version of `old_path`'s chain to `new_path`'s alias
    ///
    /// Payloads are renamed key-to-key; sidecars are rewritten (the original
    /// path changes) rather than renamed. A half-completed move is reported
    /// as [`SyncError::PartialMove`] after the remaining versions were still
    /// attempted; duplicates it leaves behind are tolerated by later passes.
    pub async fn move_remote(
        &self,
        old_path: &VaultPath,
        new_path: &VaultPath,
    ) -> Result<(), SyncError> {
        let old_alias = encode(old_path);
        let new_alias = encode(new_path);
        let extension = extension_for(new_path);

        let versions = self.chain_versions(&old_alias).await?;
        let mut partial: Option<(String, String)> = None;

        for version in versions {
            let new_key = payload_key(&new_alias, version.sequence_tag, &extension);

            if let Err(e) = self
                .op(
                    "payload rename",
                    self.store.rename(&version.payload_key, &new_key),
                )
                .await
            {
                warn!(old = %version.payload_key, new = %new_key, error = %e, "payload move failed");
                partial = Some((version.payload_key.clone(), new_key));
                continue;
            }

            let meta = SidecarMetadata::for_version(new_path, version.sequence_tag);
            if let Err(e) = self.sidecars.write(&new_key, &meta).await {
                warn!(key = %new_key, error = %e, "sidecar rewrite failed after payload move");
                partial = Some((version.payload_key.clone(), new_key));
                continue;
            }
            if let Err(e) = self.sidecars.remove(&version.payload_key).await {
                warn!(key = %version.payload_key, error = %e, "stale sidecar left behind");
                partial = Some((version.payload_key.clone(), new_key));
            }
        }

        self.forget(&old_alias).await;
        self.remember(&new_alias).await;

        match partial {
            Some((old_key, new_key)) => Err(SyncError::PartialMove { old_key, new_key }),
            None => {
                info!(old = %old_path, new = %new_path, "moved remote chain");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn snapshot_remote(&self) -> Result<RemoteInventory, SyncError> {
        let entries = self.op("store list", self.store.list(None, None)).await?;
        Ok(RemoteInventory::build(
            entries.iter().map(|e| e.key.as_str()),
        ))
    }

    /// Upload `path`'s content as a version at `tag`: payload first, then
    /// sidecar. A payload whose sidecar write fails stays orphaned and is
    /// skipped by readers until a later upload repairs the pair.
    async fn push_version(
        &self,
        path: &VaultPath,
        tag: SequenceTag,
    ) -> Result<RemoteVersion, SyncError> {
        let data = self.read_local(path).await?;
        let alias = encode(path);
        let version = RemoteVersion::compose(&alias, tag, &extension_for(path));

        self.op(
            "payload upload",
            self.store.upload(&version.payload_key, &data),
        )
        .await?;
        self.sidecars
            .write(&version.payload_key, &SidecarMetadata::for_version(path, tag))
            .await?;

        debug!(%path, key = %version.payload_key, bytes = data.len(), "uploaded version");
        Ok(version)
    }

    /// Every key belonging to `alias`'s chain, payloads and sidecars both
    ///
    /// The prefix listing can over-match when another alias begins with
    /// `<alias>__`, so each candidate is parsed and checked.
    async fn chain_keys(&self, alias: &Alias) -> Result<Vec<String>, SyncError> {
        let prefix = format!("{alias}{TAG_SEPARATOR}");
        let entries = self
            .op("store list", self.store.list(Some(&prefix), None))
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| {
                let payload = entry
                    .key
                    .strip_suffix(SIDECAR_SUFFIX)
                    .unwrap_or(&entry.key);
                RemoteVersion::parse(payload).map_or(false, |v| &v.alias == alias)
            })
            .map(|entry| entry.key)
            .collect())
    }

    /// Every payload version of `alias`'s chain
    async fn chain_versions(&self, alias: &Alias) -> Result<Vec<RemoteVersion>, SyncError> {
        let prefix = format!("{alias}{TAG_SEPARATOR}");
        let entries = self
            .op("store list", self.store.list(Some(&prefix), None))
            .await?;

        Ok(entries
            .iter()
            .filter_map(|entry| RemoteVersion::parse(&entry.key))
            .filter(|v| &v.alias == alias)
            .collect())
    }

    async fn read_local(&self, path: &VaultPath) -> Result<Vec<u8>, SyncError> {
        match tokio::time::timeout(self.op_timeout, self.vault.read(path)).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(e)) => {
                let vanished = e
                    .downcast_ref::<std::io::Error>()
                    .map_or(false, |io| io.kind() == std::io::ErrorKind::NotFound);
                if vanished {
                    Err(SyncError::LocalFileVanished(path.clone()))
                } else {
                    Err(SyncError::Transient {
                        operation: "vault read",
                        message: format!("{e:#}"),
                    })
                }
            }
            Err(_) => Err(SyncError::Transient {
                operation: "vault read",
                message: "timed out".to_string(),
            }),
        }
    }

    /// Run one port operation under the configured timeout
    async fn op<T, F>(&self, operation: &'static str, future: F) -> Result<T, SyncError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.op_timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(SyncError::Transient {
                operation,
                message: format!("{e:#}"),
            }),
            Err(_) => Err(SyncError::Transient {
                operation,
                message: "timed out".to_string(),
            }),
        }
    }

    async fn remember(&self, alias: &Alias) {
        self.synced.lock().await.insert(alias.clone());
    }

    async fn forget(&self, alias: &Alias) {
        self.synced.lock().await.remove(alias);
    }

    async fn was_synced(&self, alias: &Alias) -> bool {
        self.synced.lock().await.contains(alias)
    }
}
