//! Sync error handling

use thiserror::Error;

/// Errors that end a reconciliation cycle
///
/// Every variant is raised before the store is mutated, or (for `Store`)
/// by a merge that left the store unchanged.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The request could not be sent or the response body not read
    #[error("Failed to reach remote source ({url}): {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a non-success status
    #[error("Remote source ({url}) returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Any other transport failure
    #[error("Remote fetch failed: {0}")]
    Transport(String),

    /// The response was not a valid quote set
    #[error("Malformed remote payload: {0}")]
    MalformedPayload(String),

    /// Applying the merge to the store failed
    #[error("Failed to apply remote quotes: {0}")]
    Store(#[from] crate::error::Error),
}

impl SyncError {
    /// Whether the failure happened talking to the remote
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Http { .. } | SyncError::Status { .. } | SyncError::Transport(_)
        )
    }
}
