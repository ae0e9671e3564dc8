//! Import/export command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use quotebook_core::codec::{export_to_file, import_file};
use quotebook_core::{export_payload, Store};

use crate::output::Output;

/// Export every quote, to a file or stdout
pub fn export(store: &Store, path: Option<PathBuf>, output: &Output) -> Result<()> {
    match path {
        Some(path) => {
            export_to_file(store, &path)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            output.success(&format!(
                "Exported {} quote(s) to {}",
                store.len(),
                path.display()
            ));
        }
        // The payload itself is the output, whatever the format flags
        None => println!("{}", export_payload(store)?),
    }

    Ok(())
}

/// Import quotes from a JSON file
pub fn import(store: &mut Store, path: &Path, output: &Output) -> Result<()> {
    let report = import_file(store, path)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    output.print_import_report(&report);
    Ok(())
}
