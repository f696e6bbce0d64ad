//! CLI command implementations

pub mod config;
pub mod gc;
pub mod sync;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};

use vaultkeep_core::config::Config;
use vaultkeep_engine::reconcile::ReconcileEngine;
use vaultkeep_engine::vault::VaultDir;
use vaultkeep_engine::SyncError;
use vaultkeep_store::DirObjectStore;

/// Wire the engine to its adapters from the loaded configuration
///
/// The bundled store adapter treats `store.endpoint` as a directory path
/// (typically a mounted remote). Configuration problems fail here, before
/// any adapter touches the filesystem.
pub(crate) fn build_engine(config: &Config) -> Result<Arc<ReconcileEngine>> {
    ensure_valid(config)?;

    let store = Arc::new(
        DirObjectStore::new(&config.store.endpoint).context("failed to open remote store")?,
    );
    let vault =
        Arc::new(VaultDir::new(&config.vault.root).context("failed to open vault root")?);
    let engine = ReconcileEngine::new(store, vault, config)?;
    Ok(Arc::new(engine))
}

/// Fail fast on an invalid configuration
pub(crate) fn ensure_valid(config: &Config) -> Result<()> {
    let problems = config.validate();
    if problems.is_empty() {
        return Ok(());
    }
    let joined = problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(SyncError::Configuration(joined).into())
}
