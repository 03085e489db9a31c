//! Warden Storage - namespaced key-value persistence.
//!
//! The audit store is written against the [`KvStore`] trait, so the same
//! code runs over either backend:
//!
//! - [`MemoryKvStore`] (always available): ordered in-memory map for tests
//!   and ephemeral guards.
//! - `SurrealKvStore` (behind the **`kv`** feature): embedded, ACID,
//!   LSM-tree storage that survives restarts.
//!
//! Keys within a namespace are returned in byte order by both backends, so
//! callers can encode sort keys directly into key names.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
