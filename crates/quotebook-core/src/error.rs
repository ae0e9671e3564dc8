//! Store-level errors
//!
//! Validation and format errors are reported to the caller before anything
//! is mutated. Storage errors come from the persistence adapter; a failed
//! write leaves the in-memory store as it was before the call.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by store, filter and codec operations
#[derive(Error, Debug)]
pub enum Error {
    /// A quote failed its invariants (empty text or category)
    #[error("Invalid quote: {0}")]
    Validation(String),

    /// An import payload did not have the expected shape
    #[error("Invalid import payload: {0}")]
    Format(String),

    /// Every quote id is already taken
    #[error("No free quote id left")]
    IdsExhausted,

    /// The persistence adapter failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Serializing the record set failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller supplied bad input (as opposed to an I/O failure)
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Format(_))
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;
