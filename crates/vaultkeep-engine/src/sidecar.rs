//! Sidecar metadata manager
//!
//! Each payload object has exactly one companion sidecar at
//! `<payloadKey>.meta.json` carrying provenance: the original vault path,
//! file name, and sequence tag. The sidecar is authoritative for placing
//! downloads; the alias is never decoded back into a path.

use std::sync::Arc;

use tracing::{debug, warn};

use vaultkeep_core::domain::version::{sidecar_key_for, SidecarMetadata};
use vaultkeep_core::ports::object_store::IObjectStore;

use crate::SyncError;

/// Reads and writes provenance sidecars through the object store port
#[derive(Clone)]
pub struct SidecarManager {
    store: Arc<dyn IObjectStore>,
}

impl SidecarManager {
    /// Create a manager over `store`
    #[must_use]
    pub fn new(store: Arc<dyn IObjectStore>) -> Self {
        Self { store }
    }

    /// Write (upsert) the sidecar paired with `payload_key`
    pub async fn write(
        &self,
        payload_key: &str,
        meta: &SidecarMetadata,
    ) -> Result<(), SyncError> {
        let key = sidecar_key_for(payload_key);
        let body = serde_json::to_vec(meta).map_err(|e| SyncError::Transient {
            operation: "sidecar encode",
            message: e.to_string(),
        })?;

        debug!(key, path = %meta.original_path, "writing sidecar");
        self.store
            .upload(&key, &body)
            .await
            .map_err(|e| SyncError::Transient {
                operation: "sidecar upload",
                message: format!("{e:#}"),
            })
    }

    /// Read the sidecar paired with `payload_key`
    ///
    /// An absent sidecar is [`SyncError::SidecarMissing`]; so is a corrupt
    /// one, since a payload without usable provenance cannot be placed.
    pub async fn read(&self, payload_key: &str) -> Result<SidecarMetadata, SyncError> {
        let key = sidecar_key_for(payload_key);
        let body = self
            .store
            .download(&key)
            .await
            .map_err(|e| SyncError::Transient {
                operation: "sidecar download",
                message: format!("{e:#}"),
            })?
            .ok_or_else(|| SyncError::SidecarMissing(payload_key.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| {
            warn!(key, error = %e, "sidecar exists but is unparseable, treating as missing");
            SyncError::SidecarMissing(payload_key.to_string())
        })
    }

    /// Remove the sidecar paired with `payload_key`; absence is not an error
    pub async fn remove(&self, payload_key: &str) -> Result<(), SyncError> {
        let key = sidecar_key_for(payload_key);
        self.store
            .remove(&[key])
            .await
            .map_err(|e| SyncError::Transient {
                operation: "sidecar remove",
                message: format!("{e:#}"),
            })
    }
}
