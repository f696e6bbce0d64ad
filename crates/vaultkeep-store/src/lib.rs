//! VaultKeep Store - Object store adapters
//!
//! Provides:
//! - [`MemoryObjectStore`] - concurrent in-memory store for tests and demos
//! - [`DirObjectStore`] - flat key namespace over a local directory, for
//!   syncing against a mounted remote
//!
//! Both implement the [`IObjectStore`](vaultkeep_core::ports::IObjectStore)
//! port with upsert uploads and best-effort atomic renames.

pub mod dir;
pub mod memory;

pub use dir::DirObjectStore;
pub use memory::MemoryObjectStore;
