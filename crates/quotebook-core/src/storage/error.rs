//! Storage errors
//!
//! Every variant carries the file (or key) it concerns, and messages name
//! the piece of quote data behind it: the snapshot, the saved filter or the
//! corrupt-snapshot backup.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::persistence::keys;

/// Errors raised by the key-value backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot create quote data directory '{}': {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied writing {}", describe(.path))]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Disk full while saving {}", describe(.path))]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read {}: {source}", describe(.path))]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot save {}: {source}", describe(.path))]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temp file was written but could not be moved into place
    #[error("Could not replace {} with its new version: {source}", describe(.to))]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{key}' is not a usable storage key: {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

impl StorageError {
    /// Classify an I/O failure hit while saving `path`
    pub fn write_failed(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied { path, source }
        } else if is_disk_full(&source) {
            StorageError::DiskFull { path, source }
        } else {
            StorageError::WriteError { path, source }
        }
    }

    /// What the user can do about it, if anything
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            StorageError::DiskFull { .. } => {
                Some("Free up disk space and run the command again.".to_string())
            }
            StorageError::PermissionDenied { path, .. } => Some(format!(
                "Make sure you can write to '{}'.",
                path.parent().unwrap_or(path.as_path()).display()
            )),
            StorageError::CreateDirectory { path, .. } => Some(format!(
                "Create '{}' yourself, or point data_dir somewhere writable with \
                 `quotebook config set data_dir <dir>`.",
                path.display()
            )),
            StorageError::ReadError { path, .. } if is_key(path, keys::QUOTES) => Some(format!(
                "Check the permissions on '{}'. Until it can be read, quotebook \
                 starts from the seed quotes.",
                path.display()
            )),
            _ => None,
        }
    }
}

fn is_key(path: &Path, key: &str) -> bool {
    path.file_name().is_some_and(|name| name == key)
}

/// Human name for the file behind a storage key
fn describe(path: &Path) -> String {
    let what = if is_key(path, keys::QUOTES) {
        "the quote snapshot"
    } else if is_key(path, keys::SELECTED_CATEGORY) {
        "the saved category filter"
    } else if is_key(path, keys::CORRUPT_BACKUP) {
        "the snapshot backup"
    } else {
        return format!("'{}'", path.display());
    };
    format!("{} '{}'", what, path.display())
}

fn is_disk_full(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left") || msg.contains("disk full") || msg.contains("quota exceeded")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failed_classification() {
        let denied = StorageError::write_failed(
            PathBuf::from("/data/quotes.json"),
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        );
        assert!(matches!(denied, StorageError::PermissionDenied { .. }));
        assert_eq!(
            denied.recovery_suggestion().as_deref(),
            Some("Make sure you can write to '/data'.")
        );

        let full = StorageError::write_failed(
            PathBuf::from("/data/quotes.json"),
            io::Error::new(io::ErrorKind::Other, "No space left on device"),
        );
        assert!(matches!(full, StorageError::DiskFull { .. }));

        let other = StorageError::write_failed(
            PathBuf::from("/data/quotes.json"),
            io::Error::new(io::ErrorKind::Other, "something odd"),
        );
        assert!(matches!(other, StorageError::WriteError { .. }));
        assert!(other.recovery_suggestion().is_none());
    }

    #[test]
    fn test_messages_name_the_quote_data() {
        let err = StorageError::WriteError {
            path: PathBuf::from("/data/selected_category"),
            source: io::Error::new(io::ErrorKind::Other, "boom"),
        };
        assert_eq!(
            err.to_string(),
            "Cannot save the saved category filter '/data/selected_category': boom"
        );

        let err = StorageError::WriteError {
            path: PathBuf::from("/elsewhere/notes.txt"),
            source: io::Error::new(io::ErrorKind::Other, "boom"),
        };
        assert_eq!(err.to_string(), "Cannot save '/elsewhere/notes.txt': boom");
    }

    #[test]
    fn test_unreadable_snapshot_hint() {
        let snapshot = StorageError::ReadError {
            path: PathBuf::from("/data/quotes.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(snapshot.to_string().contains("the quote snapshot"));
        assert!(snapshot
            .recovery_suggestion()
            .is_some_and(|hint| hint.contains("seed quotes")));

        let import = StorageError::ReadError {
            path: PathBuf::from("/tmp/import.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(import.recovery_suggestion().is_none());
    }

    #[test]
    fn test_invalid_key_display() {
        let err = StorageError::InvalidKey {
            key: "../escape".to_string(),
            reason: "starts with a dot",
        };
        assert_eq!(
            err.to_string(),
            "'../escape' is not a usable storage key: starts with a dot"
        );
    }
}
