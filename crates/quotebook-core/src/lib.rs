//! Quotebook Core Library
//!
//! This crate provides the core functionality for Quotebook, a local quote
//! collection that persists between sessions and reconciles with a remote
//! quote source.
//!
//! # Architecture
//!
//! - **Store**: in-memory record sequence, persisted on every mutation
//! - **Storage**: key-value persistence behind a trait (files or memory)
//! - **Sync**: fetch-merge-persist cycles with a remote-wins conflict policy
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = Store::open_with_config(&config);
//!
//! // Add a quote
//! store.insert("Simplicity is the ultimate sophistication.", "Wisdom")?;
//!
//! // Query by category
//! let wisdom = store.query(&CategoryFilter::parse("Wisdom"));
//! ```
//!
//! # Modules
//!
//! - `store`: Quote store (main entry point)
//! - `models`: The quote record and its identity
//! - `filter`: Category filters and category enumeration
//! - `codec`: Import/export of the portable JSON format
//! - `storage`: Key-value persistence
//! - `sync`: Reconciliation with a remote source
//! - `config`: Application configuration

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;

pub use codec::{export_payload, import_payload, ImportReport};
pub use config::Config;
pub use error::{Error, Result};
pub use filter::CategoryFilter;
pub use models::{Quote, QuoteDraft, QuoteId};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError};
pub use store::Store;
