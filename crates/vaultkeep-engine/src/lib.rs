//! VaultKeep Engine - Bidirectional vault synchronization
//!
//! Provides:
//! - Full reconciliation between the local vault and the remote object store
//! - Conflict-as-copy divergence handling (no edit is ever silently lost)
//! - Event-driven change capture with a deduplicating dirty set and periodic flush
//! - Version retention (GC) over remote version chains
//!
//! ## Modules
//!
//! - [`reconcile`] - Reconciliation engine computing and applying the full diff
//! - [`capture`] - Dirty-set change capture fed by the file watcher
//! - [`watcher`] - Local filesystem watcher emitting typed change events
//! - [`sidecar`] - Per-version provenance sidecar manager
//! - [`retention`] - Version chain pruning
//! - [`vault`] - Local vault adapter over the real filesystem

pub mod capture;
pub mod namer;
pub mod reconcile;
pub mod retention;
pub mod sidecar;
pub mod vault;
pub mod watcher;

use thiserror::Error;

use vaultkeep_core::domain::errors::DomainError;
use vaultkeep_core::domain::newtypes::VaultPath;

/// Errors that can occur during synchronization operations
///
/// Per-alias failures are caught and recorded in the pass outcome; they
/// never abort the remaining aliases. Only [`SyncError::Configuration`]
/// aborts a pass, and it does so before the pass starts.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or timeout failure. Retried on the next scheduled pass only,
    /// never in a tight loop within one pass.
    #[error("transient I/O error during {operation}: {message}")]
    Transient {
        /// The store/vault operation that failed
        operation: &'static str,
        /// Adapter-reported failure description
        message: String,
    },

    /// The payload exists but its companion sidecar does not. The version
    /// is skipped, not deleted.
    #[error("sidecar missing for payload: {0}")]
    SidecarMissing(String),

    /// The path disappeared between dirty-marking and upload. Dropped
    /// silently by change capture; a delete event supersedes it.
    #[error("local file vanished: {0}")]
    LocalFileVanished(VaultPath),

    /// Missing or invalid configuration. Fails fast before any pass.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A rename emulated as copy+delete completed only halfway, leaving
    /// both keys present. The next GC or reconciliation pass tolerates the
    /// duplicate.
    #[error("partial move: {old_key} -> {new_key}")]
    PartialMove {
        /// Source key that may still exist
        old_key: String,
        /// Destination key that was written
        new_key: String,
    },

    /// A domain-level error propagated from vaultkeep-core
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Whether this failure should be surfaced or silently dropped by
    /// event-driven upload paths
    #[must_use]
    pub fn is_vanished(&self) -> bool {
        matches!(self, SyncError::LocalFileVanished(_))
    }
}
