//! Import/export of the portable quote format
//!
//! The format is a JSON array of `{ "id", "text", "category" }` objects,
//! the same shape the remote source serves.
//!
//! Import is additive: valid entries are appended to the store (see
//! [`Store::append_all`]). The outer shape must be an array or the whole
//! payload is rejected; inside the array, entries that are not objects of
//! the right shape, or that have blank text or category, are skipped.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{Quote, QuoteDraft};
use crate::storage::persistence::atomic_write;
use crate::storage::StorageError;
use crate::store::Store;

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Quotes appended to the store, with the ids they were stored under
    pub imported: Vec<Quote>,
    /// Entries rejected as malformed
    pub skipped: usize,
}

/// Serialize the whole store for download
pub fn export_payload(store: &Store) -> Result<String> {
    store.serialize()
}

/// Parse `raw` and append its valid entries to `store`
///
/// Fails with `Error::Format` (store untouched) if `raw` is not JSON or
/// not an array.
pub fn import_payload(store: &mut Store, raw: &str) -> Result<ImportReport> {
    let (drafts, skipped) = parse_payload(raw)?;
    let imported = store.append_all(drafts)?;

    info!(imported = imported.len(), skipped, "import finished");
    Ok(ImportReport { imported, skipped })
}

/// Write the export payload to `path`
pub fn export_to_file(store: &Store, path: &Path) -> Result<()> {
    let payload = export_payload(store)?;
    atomic_write(path, payload.as_bytes())?;
    Ok(())
}

/// Read `path` and import its contents
pub fn import_file(store: &mut Store, path: &Path) -> Result<ImportReport> {
    let raw = fs::read_to_string(path).map_err(|source| StorageError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    import_payload(store, &raw)
}

/// Split a payload into valid drafts and a count of rejected entries
fn parse_payload(raw: &str) -> Result<(Vec<QuoteDraft>, usize)> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| Error::Format(format!("not valid JSON: {}", e)))?;

    let Value::Array(entries) = value else {
        return Err(Error::Format(format!(
            "expected a JSON array of quotes, found {}",
            json_kind(&value)
        )));
    };

    let mut drafts = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<QuoteDraft>(entry) {
            Ok(draft) if draft.is_valid() => drafts.push(draft),
            Ok(_) => {
                warn!(index, "skipping import entry with blank text or category");
                skipped += 1;
            }
            Err(e) => {
                warn!(index, "skipping malformed import entry: {}", e);
                skipped += 1;
            }
        }
    }

    Ok((drafts, skipped))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteId;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_doubles_and_preserves_originals() {
        let mut store = Store::in_memory();
        store.insert("Extra", "Misc").unwrap();
        let originals = store.all().to_vec();

        let payload = export_payload(&store).unwrap();
        let report = import_payload(&mut store, &payload).unwrap();

        assert_eq!(report.skipped, 0);
        assert_eq!(report.imported.len(), originals.len());
        assert_eq!(store.len(), originals.len() * 2);
        assert_eq!(&store.all()[..originals.len()], originals.as_slice());

        for (original, copy) in originals.iter().zip(&report.imported) {
            assert_eq!(original.text, copy.text);
            assert_eq!(original.category, copy.category);
        }
    }

    #[test]
    fn test_import_rejects_non_array() {
        let mut store = Store::in_memory();
        let before = store.len();

        for raw in [r#"{"id": 1, "text": "A", "category": "X"}"#, "42", "nope"] {
            let err = import_payload(&mut store, raw).unwrap_err();
            assert!(matches!(err, Error::Format(_)), "payload {raw:?}");
        }
        assert_eq!(store.len(), before);
    }

    #[test]
    fn test_import_skips_malformed_entries() {
        let mut store = Store::in_memory();
        let before = store.len();

        let raw = r#"[
            {"id": 500, "text": "Good", "category": "Fine"},
            {"id": 501, "text": "", "category": "Fine"},
            {"id": 502, "text": "No category"},
            "just a string",
            {"text": "No id", "category": "Fine"}
        ]"#;

        let report = import_payload(&mut store, raw).unwrap();

        assert_eq!(report.skipped, 3);
        assert_eq!(report.imported.len(), 2);
        assert_eq!(report.imported[0].id, QuoteId(500));
        assert_eq!(store.len(), before + 2);
    }

    #[test]
    fn test_import_skips_entries_using_the_all_selector() {
        let mut store = Store::in_memory();

        let raw = r#"[
            {"text": "Tagged all", "category": "all"},
            {"text": "Tagged ALL", "category": " ALL "},
            {"text": "Kept", "category": "Wisdom"}
        ]"#;
        let report = import_payload(&mut store, raw).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.imported.len(), 1);
        assert_eq!(
            store.available_categories(),
            vec!["all", "Motivation", "Life", "Inspiration", "Wisdom"]
        );
    }

    #[test]
    fn test_import_empty_array() {
        let mut store = Store::in_memory();
        let report = import_payload(&mut store, "[]").unwrap();
        assert_eq!(report, ImportReport::default());
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("export").join("quotes.json");

        let source = Store::in_memory();
        export_to_file(&source, &path).unwrap();

        let mut target = Store::in_memory();
        let report = import_file(&mut target, &path).unwrap();
        assert_eq!(report.imported.len(), source.len());
        assert_eq!(target.len(), source.len() * 2);
    }

    #[test]
    fn test_import_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::in_memory();

        let err = import_file(&mut store, &temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::ReadError { .. })));
    }
}
