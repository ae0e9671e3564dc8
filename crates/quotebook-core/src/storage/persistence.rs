//! Key-value persistence
//!
//! The store never touches the filesystem directly. It reads and writes raw
//! strings under a handful of well-known keys through [`KeyValueStore`].
//!
//! Storage location: `~/.local/share/quotebook/` (configurable via `Config`)
//!
//! Files (one per key):
//! - `quotes.json` - The record snapshot
//! - `selected_category` - The active filter preference
//! - `quotes.corrupt.backup` - The last snapshot that failed to parse

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{StorageError, StorageResult};

/// Well-known storage keys
pub mod keys {
    /// Serialized record snapshot
    pub const QUOTES: &str = "quotes.json";
    /// Last selected category filter
    pub const SELECTED_CATEGORY: &str = "selected_category";
    /// Last displayed quote (session scope only)
    pub const LAST_QUOTE: &str = "last_quote";
    /// Copy of a snapshot that could not be parsed
    pub const CORRUPT_BACKUP: &str = "quotes.corrupt.backup";
}

/// Durable or session-scoped string storage
///
/// `get` returns `Ok(None)` when nothing has been stored under `key`.
/// A successful `set` is visible to every later `get`.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

/// Stores each key as a file inside a directory
///
/// Writes are atomic (write to temp file, then rename) so a crash never
/// leaves a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Create a store rooted at `dir`. The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }

    /// Size in bytes of the value stored under `key`, if any
    pub fn size_of(&self, key: &str) -> StorageResult<Option<u64>> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadError { path, source: e }),
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadError { path, source: e }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        atomic_write(&path, value.as_bytes())?;
        debug!(key, bytes = value.len(), "wrote storage key");
        Ok(())
    }
}

/// In-memory storage, used for session-scoped values and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keys become file names, so keep them to a safe character set
fn validate_key(key: &str) -> StorageResult<()> {
    let reason = if key.is_empty() {
        "empty"
    } else if key.starts_with('.') {
        "starts with a dot"
    } else if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        "only letters, digits, '_', '-' and '.' are allowed"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    // Failures are reported against the target, not the temp file
    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::write_failed(path.to_path_buf(), e))?;
    file.write_all(data)
        .map_err(|e| StorageError::write_failed(path.to_path_buf(), e))?;
    file.sync_all()
        .map_err(|e| StorageError::write_failed(path.to_path_buf(), e))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
