//! Remote object store port (driven/secondary port)
//!
//! This module defines the interface for the remote object store: a flat
//! key namespace with binary-safe values. The bundled adapters are an
//! in-memory store (tests, demos) and a directory-backed store; an S3-style
//! adapter fits the same trait.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - The store is treated as append-mostly: new payload and sidecar keys
//!   are added; same-key uploads are upserts (overwrite).
//! - Implementations are constructed collaborators passed into the engine;
//!   a single connection is created once and cached for the engine's
//!   lifetime, never re-created per call.

use serde::{Deserialize, Serialize};

/// A single entry from a listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// The object key within the flat namespace
    pub key: String,
}

/// Port trait for remote object store operations
///
/// ## Implementation Notes
///
/// - `rename` is best-effort atomic; an adapter without a native move MUST
///   emulate it as copy-then-remove, and callers tolerate the partial state
///   (both keys present) that a failed remove leaves behind.
/// - `download` distinguishes "key absent" (`Ok(None)`) from transport
///   failure (`Err`), because a missing sidecar is a recoverable skip while
///   a network error is a transient failure.
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Lists keys, optionally restricted to a prefix and capped at `limit`
    ///
    /// # Arguments
    /// * `prefix` - Only keys starting with this prefix are returned
    /// * `limit` - Maximum number of entries to return
    async fn list(
        &self,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<ObjectEntry>>;

    /// Stores `data` under `key`, overwriting any existing value
    async fn upload(&self, key: &str, data: &[u8]) -> anyhow::Result<()>;

    /// Fetches the value stored under `key`
    ///
    /// # Returns
    /// `Ok(None)` if the key does not exist
    async fn download(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Removes the given keys; absent keys are ignored
    async fn remove(&self, keys: &[String]) -> anyhow::Result<()>;

    /// Moves the value from `old_key` to `new_key`
    ///
    /// Best-effort atomic. Emulations (copy + remove) may leave both keys
    /// present when the remove half fails; callers must tolerate the
    /// duplicate rather than crash.
    async fn rename(&self, old_key: &str, new_key: &str) -> anyhow::Result<()>;
}
