//! Directory-backed object store adapter
//!
//! Maps the flat key namespace onto a single local directory: one file per
//! key, with the key percent-encoded into the file name. Useful for syncing
//! against a mounted remote (NFS, rclone mount, USB drive) and for
//! integration tests that need real I/O.
//!
//! ## Design Decisions
//!
//! - **Atomic uploads**: write-to-temp + rename, so a crashed upload never
//!   leaves a half-written payload behind. Temp files live in a staging
//!   subdirectory, never under key-visible names: keys map to files directly
//!   under the root, so an in-flight upload can never be mistaken for a key
//!   and a key can never be mistaken for an in-flight upload (payload keys
//!   take their extension from the vault file, `.tmp` included).
//! - **Rename fallback**: `rename` tries the filesystem's atomic rename
//!   first and falls back to copy-then-remove across devices; the partial
//!   state a failed remove leaves (both keys present) is tolerated by the
//!   engine and GC.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::{debug, warn};
use uuid::Uuid;

use vaultkeep_core::ports::object_store::{IObjectStore, ObjectEntry};

/// Characters that cannot appear in a file name and the escape character
/// itself. Keys produced by the engine are already storage-safe; this set
/// keeps the adapter total over arbitrary keys.
const FILENAME_UNSAFE: &AsciiSet = &CONTROLS.add(b'/').add(b'\\').add(b'%');

/// Subdirectory holding in-flight uploads; `list` only reports regular
/// files in the root, so nothing in here is ever visible as a key.
const STAGING_DIR: &str = ".staging";

/// [`IObjectStore`] implementation over a flat directory
#[derive(Debug, Clone)]
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(STAGING_DIR))?;
        Ok(Self { root })
    }

    /// The directory backing this store
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, key: &str) -> PathBuf {
        let name = utf8_percent_encode(key, FILENAME_UNSAFE).to_string();
        self.root.join(name)
    }

    fn key_for(file_name: &str) -> Option<String> {
        percent_decode_str(file_name)
            .decode_utf8()
            .ok()
            .map(|cow| cow.into_owned())
    }
}

#[async_trait::async_trait]
impl IObjectStore for DirObjectStore {
    async fn list(
        &self,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<ObjectEntry>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(?name, "skipping non-UTF-8 entry in store directory");
                continue;
            };
            let Some(key) = Self::key_for(name) else {
                continue;
            };
            if prefix.map_or(true, |p| key.starts_with(p)) {
                keys.push(key);
            }
        }

        keys.sort();
        if let Some(limit) = limit {
            keys.truncate(limit);
        }
        Ok(keys.into_iter().map(|key| ObjectEntry { key }).collect())
    }

    async fn upload(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        let target = self.file_for(key);
        let staged = self
            .root
            .join(STAGING_DIR)
            .join(Uuid::new_v4().to_string());

        debug!(key, bytes = data.len(), "dir store upload");
        tokio::fs::write(&staged, data).await?;
        tokio::fs::rename(&staged, &target).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.file_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, keys: &[String]) -> anyhow::Result<()> {
        for key in keys {
            match tokio::fs::remove_file(self.file_for(key)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn rename(&self, old_key: &str, new_key: &str) -> anyhow::Result<()> {
        let from = self.file_for(old_key);
        let to = self.file_for(new_key);

        match tokio::fs::rename(&from, &to).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                anyhow::bail!("rename source not found: {old_key}")
            }
            Err(_) => {
                // Cross-device fallback: copy then remove. A failure after
                // the copy leaves both keys; the caller tolerates that.
                tokio::fs::copy(&from, &to).await?;
                tokio::fs::remove_file(&from).await?;
                Ok(())
            }
        }
    }
}
