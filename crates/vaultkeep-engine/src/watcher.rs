//! Vault file watching
//!
//! Wraps the `notify` crate to monitor the vault root, converting raw OS
//! events into vault-relative [`ChangeEvent`] values. Events for hidden
//! entries (any dot-prefixed path segment) and for paths outside the vault
//! root are discarded at the source.
//!
//! ```text
//! inotify
//!    │
//!    ▼
//! VaultWatcher ──→ mpsc::channel ──→ ChangeCapture ──→ ReconcileEngine
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use vaultkeep_core::domain::newtypes::VaultPath;

// ============================================================================
// ChangeEvent
// ============================================================================

/// A local vault change detected by the watcher
///
/// Paths are vault-relative; the watcher owns the translation from the
/// absolute paths `notify` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A new file appeared
    Created(VaultPath),
    /// An existing file's content or metadata changed
    Modified(VaultPath),
    /// A file was removed
    Deleted(VaultPath),
    /// A file moved within the vault
    Renamed {
        /// Path before the move
        old: VaultPath,
        /// Path after the move
        new: VaultPath,
    },
}

impl ChangeEvent {
    /// The path this event primarily concerns (the destination for renames)
    #[must_use]
    pub fn path(&self) -> &VaultPath {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Deleted(p) => p,
            ChangeEvent::Renamed { new, .. } => new,
        }
    }
}

// ============================================================================
// VaultWatcher
// ============================================================================

/// Watches the vault root recursively using the OS-native mechanism
///
/// Dropping the watcher stops event delivery.
pub struct VaultWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl VaultWatcher {
    /// Create a watcher for `root` and return it with the event receiver
    ///
    /// # Errors
    /// Returns an error if the underlying OS watcher cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let root = root.into();
        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(1024);

        info!(root = %root.display(), "initializing vault watcher");

        let callback_root = root.clone();
        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(change) = map_notify_event(&callback_root, &event) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            warn!(error = %e, "change event receiver dropped");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "vault watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("failed to create vault watcher")?;

        Ok((Self { watcher, root }, event_rx))
    }

    /// Start watching the vault root recursively
    ///
    /// # Errors
    /// Returns an error if the root cannot be watched (missing directory,
    /// permissions, inotify watch limit).
    pub fn start(&mut self) -> Result<()> {
        info!(root = %self.root.display(), "starting recursive watch");
        self.watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch vault root: {}", self.root.display()))
    }

    /// Stop watching the vault root
    pub fn stop(&mut self) -> Result<()> {
        info!(root = %self.root.display(), "stopping watch");
        self.watcher
            .unwatch(&self.root)
            .with_context(|| format!("failed to unwatch vault root: {}", self.root.display()))
    }
}

// ============================================================================
// Event mapping
// ============================================================================

/// Translate an absolute path into a vault-relative [`VaultPath`]
///
/// Returns `None` for paths outside the root, hidden paths (any dot-prefixed
/// segment), and paths that fail vault validation.
fn relativize(root: &Path, absolute: &Path) -> Option<VaultPath> {
    let relative = absolute.strip_prefix(root).ok()?;
    let relative = relative.to_str()?;
    if relative
        .split(['/', '\\'])
        .any(|segment| segment.starts_with('.'))
    {
        return None;
    }
    VaultPath::new(relative).ok()
}

/// Convert a `notify::Event` into a vault-relative [`ChangeEvent`]
///
/// - `Create(*)` becomes `Created`
/// - `Modify(Data(*))` and other `Modify(*)` become `Modified`
/// - `Modify(Name(Both))` with two in-vault paths becomes `Renamed`; a
///   rename that leaves the vault (or leaves a hidden destination) is a
///   `Deleted` of the source, and one that enters the vault is a `Created`
/// - `Remove(*)` becomes `Deleted`
/// - Access events and pathless events are ignored
fn map_notify_event(root: &Path, event: &notify::Event) -> Option<ChangeEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(_) => {
            let path = relativize(root, paths.first()?)?;
            debug!(%path, "mapped create event");
            Some(ChangeEvent::Created(path))
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            let old = relativize(root, &paths[0]);
            let new = relativize(root, &paths[1]);
            match (old, new) {
                (Some(old), Some(new)) => {
                    debug!(%old, %new, "mapped rename event");
                    Some(ChangeEvent::Renamed { old, new })
                }
                (Some(old), None) => Some(ChangeEvent::Deleted(old)),
                (None, Some(new)) => Some(ChangeEvent::Created(new)),
                (None, None) => None,
            }
        }

        EventKind::Modify(_) => {
            let path = relativize(root, paths.first()?)?;
            debug!(%path, kind = ?event.kind, "mapped modify event");
            Some(ChangeEvent::Modified(path))
        }

        EventKind::Remove(_) => {
            let path = relativize(root, paths.first()?)?;
            debug!(%path, "mapped remove event");
            Some(ChangeEvent::Deleted(path))
        }

        _ => {
            debug!(kind = ?event.kind, "ignoring event kind");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/vault")
    }

    fn vp(s: &str) -> VaultPath {
        VaultPath::new(s).unwrap()
    }

    fn raw(kind: EventKind, paths: Vec<&str>) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.into_iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_map_create_event() {
        let event = raw(
            EventKind::Create(notify::event::CreateKind::File),
            vec!["/vault/notes/a.md"],
        );
        assert_eq!(
            map_notify_event(&root(), &event),
            Some(ChangeEvent::Created(vp("notes/a.md")))
        );
    }

    #[test]
    fn test_map_modify_data_event() {
        let event = raw(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            vec!["/vault/a.md"],
        );
        assert_eq!(
            map_notify_event(&root(), &event),
            Some(ChangeEvent::Modified(vp("a.md")))
        );
    }

    #[test]
    fn test_map_remove_event() {
        let event = raw(
            EventKind::Remove(notify::event::RemoveKind::File),
            vec!["/vault/a.md"],
        );
        assert_eq!(
            map_notify_event(&root(), &event),
            Some(ChangeEvent::Deleted(vp("a.md")))
        );
    }

    #[test]
    fn test_map_rename_event() {
        let event = raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec!["/vault/old.md", "/vault/sub/new.md"],
        );
        assert_eq!(
            map_notify_event(&root(), &event),
            Some(ChangeEvent::Renamed {
                old: vp("old.md"),
                new: vp("sub/new.md"),
            })
        );
    }

    #[test]
    fn test_map_rename_leaving_vault_is_delete() {
        let event = raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec!["/vault/a.md", "/elsewhere/a.md"],
        );
        assert_eq!(
            map_notify_event(&root(), &event),
            Some(ChangeEvent::Deleted(vp("a.md")))
        );
    }

    #[test]
    fn test_map_rename_into_hidden_is_delete() {
        let event = raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec!["/vault/a.md", "/vault/.trash/a.md"],
        );
        assert_eq!(
            map_notify_event(&root(), &event),
            Some(ChangeEvent::Deleted(vp("a.md")))
        );
    }

    #[test]
    fn test_hidden_paths_ignored() {
        let event = raw(
            EventKind::Create(notify::event::CreateKind::File),
            vec!["/vault/.git/config"],
        );
        assert_eq!(map_notify_event(&root(), &event), None);

        let event = raw(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            vec!["/vault/notes/.a.md.tmp"],
        );
        assert_eq!(map_notify_event(&root(), &event), None);
    }

    #[test]
    fn test_paths_outside_root_ignored() {
        let event = raw(
            EventKind::Create(notify::event::CreateKind::File),
            vec!["/other/a.md"],
        );
        assert_eq!(map_notify_event(&root(), &event), None);
    }

    #[test]
    fn test_access_events_ignored() {
        let event = raw(
            EventKind::Access(notify::event::AccessKind::Read),
            vec!["/vault/a.md"],
        );
        assert_eq!(map_notify_event(&root(), &event), None);
    }

    #[test]
    fn test_event_path_accessor() {
        let renamed = ChangeEvent::Renamed {
            old: vp("a.md"),
            new: vp("b.md"),
        };
        assert_eq!(renamed.path(), &vp("b.md"));
        assert_eq!(ChangeEvent::Deleted(vp("c.md")).path(), &vp("c.md"));
    }
}
