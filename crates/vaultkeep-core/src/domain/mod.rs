//! Domain types and pure logic
//!
//! This module contains the core domain types for VaultKeep:
//! - Newtypes for vault-relative paths, aliases, and sequence tags
//! - The alias codec (path -> storage-safe key)
//! - Remote version chains, sidecar metadata, and inventory snapshots
//! - Domain-specific error types

pub mod alias;
pub mod errors;
pub mod newtypes;
pub mod version;

// Re-export commonly used types
pub use alias::encode;
pub use errors::DomainError;
pub use newtypes::{Alias, SequenceTag, VaultPath};
pub use version::{
    LocalInventory, RemoteInventory, RemoteVersion, SidecarMetadata, VaultFileRecord,
    SIDECAR_SUFFIX, TAG_SEPARATOR,
};
