//! Category command handlers

use anyhow::{Context, Result};

use quotebook_core::{CategoryFilter, Store};

use crate::output::{Output, OutputFormat};

/// List categories with counts
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let counts = store.category_counts();
    output.print_categories(&counts, &store.current_filter());
    Ok(())
}

/// Show the saved filter
pub fn show_filter(store: &Store, output: &Output) -> Result<()> {
    let filter = store.current_filter();

    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "filter": filter.to_string() }));
        }
        OutputFormat::Quiet => println!("{}", filter),
        OutputFormat::Human => println!("Current filter: {}", filter),
    }

    Ok(())
}

/// Save a filter
///
/// Any name is accepted; a category nobody uses yet just matches nothing.
pub fn set_filter(store: &mut Store, value: &str, output: &Output) -> Result<()> {
    let filter = CategoryFilter::parse(value);
    let known = filter.is_all() || store.available_categories().iter().any(|c| c == value.trim());

    store
        .set_filter(filter.clone())
        .context("Failed to save filter")?;

    output.success(&format!("Filter set to {}", filter));
    if !known {
        output.message(&format!("  Note: no quotes in '{}' yet", filter));
    }

    Ok(())
}
