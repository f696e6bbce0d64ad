//! Local vault adapter over the real filesystem
//!
//! Implements [`ILocalVault`] for a vault rooted at a local directory. All
//! port paths are vault-relative; this adapter owns the mapping to absolute
//! paths.
//!
//! ## Design Notes
//!
//! - **Atomic writes**: content goes to a hidden temp file first, gets its
//!   mtime stamped, then is renamed over the target. Enumeration and the
//!   watcher both skip hidden entries, so half-written temp files are never
//!   observed as vault content.
//! - **mtime stamping**: downloads are written with their sequence tag as
//!   mtime so the next reconciliation pass sees local and remote as equal.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use vaultkeep_core::domain::newtypes::VaultPath;
use vaultkeep_core::domain::version::VaultFileRecord;
use vaultkeep_core::ports::local_vault::ILocalVault;

/// [`ILocalVault`] implementation over a directory tree
#[derive(Debug, Clone)]
pub struct VaultDir {
    root: PathBuf,
}

impl VaultDir {
    /// Create a vault rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create vault root: {}", root.display()))?;
        Ok(Self { root })
    }

    /// The absolute vault root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, path: &VaultPath) -> PathBuf {
        path.resolve(&self.root)
    }

    fn hidden(name: &std::ffi::OsStr) -> bool {
        name.to_str().map_or(true, |n| n.starts_with('.'))
    }
}

fn datetime_of(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[async_trait::async_trait]
impl ILocalVault for VaultDir {
    async fn enumerate(&self) -> Result<Vec<VaultFileRecord>> {
        let mut records = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("failed to read directory: {}", dir.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                if Self::hidden(&entry.file_name()) {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let absolute = entry.path();
                let relative = absolute
                    .strip_prefix(&self.root)
                    .expect("walk never leaves the vault root");
                let Some(relative) = relative.to_str() else {
                    warn!(path = %absolute.display(), "skipping non-UTF-8 path");
                    continue;
                };
                let Ok(path) = VaultPath::new(relative) else {
                    warn!(relative, "skipping path that fails vault validation");
                    continue;
                };

                let modified = entry.metadata().await?.modified()?;
                records.push(VaultFileRecord {
                    path,
                    modified: datetime_of(modified),
                });
            }
        }

        debug!(count = records.len(), "enumerated vault");
        Ok(records)
    }

    async fn read(&self, path: &VaultPath) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.absolute(path)).await?;
        Ok(data)
    }

    async fn write(&self, path: &VaultPath, data: &[u8], modified: DateTime<Utc>) -> Result<()> {
        let target = self.absolute(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Hidden temp name so enumeration and the watcher never see it.
        let temp_name = format!(".{}.{}.tmp", path.file_name(), Uuid::new_v4());
        let temp = target
            .parent()
            .map(|p| p.join(&temp_name))
            .unwrap_or_else(|| PathBuf::from(&temp_name));

        tokio::fs::write(&temp, data).await?;

        // Stamp the mtime on the temp file; the rename carries it over.
        let stamp = SystemTime::from(modified);
        let temp_for_stamp = temp.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let file = std::fs::OpenOptions::new()
                .write(true)
                .open(&temp_for_stamp)?;
            file.set_modified(stamp)
        })
        .await
        .context("mtime stamping task panicked")??;

        tokio::fs::rename(&temp, &target).await?;
        debug!(%path, bytes = data.len(), "vault write");
        Ok(())
    }

    async fn delete(&self, path: &VaultPath) -> Result<()> {
        match tokio::fs::remove_file(self.absolute(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &VaultPath, to: &VaultPath) -> Result<()> {
        let target = self.absolute(to);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(self.absolute(from), target).await?;
        Ok(())
    }

    async fn modified_at(&self, path: &VaultPath) -> Result<Option<DateTime<Utc>>> {
        match tokio::fs::metadata(self.absolute(path)).await {
            Ok(meta) => Ok(Some(datetime_of(meta.modified()?))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vaultkeep_core::domain::newtypes::SequenceTag;

    fn path(s: &str) -> VaultPath {
        VaultPath::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let vault = VaultDir::new(dir.path()).unwrap();

        vault
            .write(&path("notes/a.md"), b"hello", Utc::now())
            .await
            .unwrap();
        let data = vault.read(&path("notes/a.md")).await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn test_write_stamps_mtime() {
        let dir = TempDir::new().unwrap();
        let vault = VaultDir::new(dir.path()).unwrap();

        let tag = SequenceTag::from_millis(1_700_000_000_000).unwrap();
        vault
            .write(&path("a.md"), b"x", tag.to_datetime())
            .await
            .unwrap();

        let modified = vault.modified_at(&path("a.md")).await.unwrap().unwrap();
        assert_eq!(SequenceTag::from_datetime(modified), tag);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let vault = VaultDir::new(dir.path()).unwrap();

        let err = vault.read(&path("ghost.md")).await.unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_enumerate_skips_hidden_and_dirs() {
        let dir = TempDir::new().unwrap();
        let vault = VaultDir::new(dir.path()).unwrap();

        vault.write(&path("a.md"), b"", Utc::now()).await.unwrap();
        vault
            .write(&path("sub/b.md"), b"", Utc::now())
            .await
            .unwrap();
        std::fs::write(dir.path().join(".hidden"), b"x").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config"), b"x").unwrap();

        let mut paths: Vec<String> = vault
            .enumerate()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.path.as_str().to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["a.md", "sub/b.md"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let vault = VaultDir::new(dir.path()).unwrap();

        vault.write(&path("a.md"), b"", Utc::now()).await.unwrap();
        vault.delete(&path("a.md")).await.unwrap();
        vault.delete(&path("a.md")).await.unwrap();
        assert!(vault.modified_at(&path("a.md")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_preserves_mtime() {
        let dir = TempDir::new().unwrap();
        let vault = VaultDir::new(dir.path()).unwrap();

        let tag = SequenceTag::from_millis(1_600_000_000_000).unwrap();
        vault
            .write(&path("old.md"), b"v", tag.to_datetime())
            .await
            .unwrap();
        vault
            .rename(&path("old.md"), &path("moved/new.md"))
            .await
            .unwrap();

        assert!(vault.modified_at(&path("old.md")).await.unwrap().is_none());
        let modified = vault
            .modified_at(&path("moved/new.md"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(SequenceTag::from_datetime(modified), tag);
    }
}
