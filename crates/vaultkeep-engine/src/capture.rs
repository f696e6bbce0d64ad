//! Change capture: dirty set plus periodic flush
//!
//! Consumes [`ChangeEvent`]s from the vault watcher:
//!
//! - create/modify mark the path dirty; the dirty set deduplicates, so ten
//!   rapid saves cost one upload
//! - delete immediately removes the path's remote chain
//! - rename immediately moves the remote chain to the new alias
//!
//! A periodic timer drains the dirty set and uploads one version per
//! distinct path. An empty set is a no-op: no network activity when nothing
//! changed. The set is guarded by one mutex so an event's insert and the
//! timer's drain-and-clear can never lose a path to each other.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vaultkeep_core::domain::newtypes::VaultPath;

use crate::reconcile::ReconcileEngine;
use crate::watcher::ChangeEvent;

/// Translates watcher events into engine operations
pub struct ChangeCapture {
    engine: Arc<ReconcileEngine>,
    dirty: Mutex<HashSet<VaultPath>>,
    flush_interval: Duration,
}

impl ChangeCapture {
    /// Create a capture stage feeding `engine`, flushing every `flush_interval`
    #[must_use]
    pub fn new(engine: Arc<ReconcileEngine>, flush_interval: Duration) -> Self {
        Self {
            engine,
            dirty: Mutex::new(HashSet::new()),
            flush_interval,
        }
    }

    /// Apply one change event
    ///
    /// Deletes and renames act on the remote store immediately; their
    /// failures are logged and left for the next full pass to repair.
    pub async fn note(&self, event: ChangeEvent) {
        match event {
            ChangeEvent::Created(path) | ChangeEvent::Modified(path) => {
                debug!(%path, "marked dirty");
                self.dirty.lock().await.insert(path);
            }
            ChangeEvent::Deleted(path) => {
                self.dirty.lock().await.remove(&path);
                if let Err(e) = self.engine.remove_remote(&path).await {
                    warn!(%path, error = %e, "remote delete failed, next pass will repair");
                }
            }
            ChangeEvent::Renamed { old, new } => {
                // A pending upload for the old path now belongs to the new one.
                {
                    let mut dirty = self.dirty.lock().await;
                    if dirty.remove(&old) {
                        dirty.insert(new.clone());
                    }
                }
                if let Err(e) = self.engine.move_remote(&old, &new).await {
                    warn!(%old, %new, error = %e, "remote move incomplete, next pass will repair");
                }
            }
        }
    }

    /// Drain the dirty set and upload each path once
    ///
    /// Returns the number of versions uploaded. Vanished files are dropped
    /// silently; their delete event supersedes the pending upload.
    pub async fn flush(&self) -> usize {
        let pending: Vec<VaultPath> = {
            let mut dirty = self.dirty.lock().await;
            dirty.drain().collect()
        };
        if pending.is_empty() {
            return 0;
        }

        let mut uploaded = 0;
        for path in pending {
            match self.engine.upload_path(&path).await {
                Ok(()) => uploaded += 1,
                Err(e) if e.is_vanished() => {
                    debug!(%path, "dirty path vanished before upload, dropping");
                }
                Err(e) => {
                    warn!(%path, error = %e, "upload failed, next pass will retry");
                }
            }
        }
        info!(uploaded, "flushed dirty set");
        uploaded
    }

    /// Number of paths currently marked dirty
    pub async fn pending_count(&self) -> usize {
        self.dirty.lock().await.len()
    }

    /// Consume events and flush periodically until cancelled
    ///
    /// A final flush runs on shutdown so edits made just before exit are
    /// not lost.
    pub async fn run(&self, mut events: mpsc::Receiver<ChangeEvent>, cancel: CancellationToken) {
        let mut timer = tokio::time::interval(self.flush_interval);
        // The first tick fires immediately; skip it so startup does not
        // race the initial full pass.
        timer.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("change capture cancelled, final flush");
                    self.flush().await;
                    break;
                }
                maybe = events.recv() => match maybe {
                    Some(event) => self.note(event).await,
                    None => {
                        debug!("watcher channel closed, final flush");
                        self.flush().await;
                        break;
                    }
                },
                _ = timer.tick() => {
                    self.flush().await;
                }
            }
        }
    }
}
