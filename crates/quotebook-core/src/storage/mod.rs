//! Storage layer
//!
//! Durable and session-scoped key-value storage behind the
//! [`KeyValueStore`] trait.
//!
//! ## Architecture
//!
//! - **FileKeyValueStore**: one file per key in the data directory, atomic writes
//! - **MemoryKeyValueStore**: process-lifetime storage for session values and tests
//!
//! The store serializes its record snapshot and preferences to strings and
//! hands them to whichever backend it was opened with.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{keys, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
