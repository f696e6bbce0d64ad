//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IObjectStore`] - Flat-key remote object storage (list/upload/download/remove/rename)
//! - [`ILocalVault`] - Local vault tree operations with per-file modification times

pub mod local_vault;
pub mod object_store;

pub use local_vault::ILocalVault;
pub use object_store::{IObjectStore, ObjectEntry};
