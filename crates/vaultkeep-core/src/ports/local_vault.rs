//! Local vault port (driven/secondary port)
//!
//! This module defines the interface for the local file tree being synced.
//! All paths are vault-relative [`VaultPath`] values; the adapter owns the
//! mapping to absolute filesystem paths.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - `write` takes the modification time to stamp on the file: downloads
//!   are written with their sequence tag as mtime so a following pass sees
//!   local and remote as equal (idempotence).
//! - Change watching is not part of this trait; the engine's `VaultWatcher`
//!   observes the vault root directly.

use chrono::{DateTime, Utc};

use crate::domain::newtypes::VaultPath;
use crate::domain::version::VaultFileRecord;

/// Port trait for local vault operations
#[async_trait::async_trait]
pub trait ILocalVault: Send + Sync {
    /// Enumerates every file in the vault with its modification time
    ///
    /// Directories are not reported; hidden entries (dot-prefixed) are
    /// excluded, matching what the watcher ignores.
    async fn enumerate(&self) -> anyhow::Result<Vec<VaultFileRecord>>;

    /// Reads the entire contents of a file
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be read; the
    /// caller distinguishes vanished files via the underlying
    /// `std::io::ErrorKind::NotFound`.
    async fn read(&self, path: &VaultPath) -> anyhow::Result<Vec<u8>>;

    /// Writes data to a file atomically and stamps `modified` as its mtime
    ///
    /// Parent directories are created as needed; an existing file is
    /// replaced.
    async fn write(
        &self,
        path: &VaultPath,
        data: &[u8],
        modified: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Deletes a file; absent files are not an error
    async fn delete(&self, path: &VaultPath) -> anyhow::Result<()>;

    /// Renames a file within the vault, preserving its mtime
    async fn rename(&self, from: &VaultPath, to: &VaultPath) -> anyhow::Result<()>;

    /// Modification time of a file, `None` if it does not exist
    async fn modified_at(&self, path: &VaultPath) -> anyhow::Result<Option<DateTime<Utc>>>;
}
