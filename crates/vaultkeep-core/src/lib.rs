//! VaultKeep Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `VaultPath`, `Alias`, `SequenceTag`, `RemoteVersion`,
//!   `SidecarMetadata`, and the inventory snapshots built each reconciliation pass
//! - **Alias codec** - deterministic mapping from vault paths to storage-safe keys
//! - **Port definitions** - Traits for adapters: `IObjectStore`, `ILocalVault`
//! - **Configuration** - typed YAML configuration with validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure logic with no I/O. Ports define trait
//! interfaces that adapter crates implement. The engine crate orchestrates
//! domain types through the port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
