//! Quote command handlers

use anyhow::{Context, Result};

use quotebook_core::{CategoryFilter, Store};

use crate::output::Output;

/// Add a quote
pub fn add(store: &mut Store, text: &str, category: &str, output: &Output) -> Result<()> {
    let quote = store
        .insert(text, category)
        .context("Failed to add quote")?;

    if output.is_json() {
        output.print_quote(&quote);
    } else {
        output.success(&format!("Added quote #{} to {}", quote.id, quote.category));
    }

    Ok(())
}

/// List quotes, using the saved filter unless a category is given
pub fn list(store: &Store, category: Option<String>, output: &Output) -> Result<()> {
    let filter = resolve_filter(store, category.as_deref());
    let quotes = store.query(&filter);
    output.print_quotes(&quotes, &filter);
    Ok(())
}

/// Show a random quote, avoiding the one shown last
pub fn show(store: &mut Store, category: Option<String>, output: &Output) -> Result<()> {
    let filter = resolve_filter(store, category.as_deref());

    match store
        .random_quote(&filter)
        .context("Failed to pick a quote")?
    {
        Some(quote) => output.print_quote(&quote),
        None if filter.is_all() => output.message("No quotes yet. Add one with `quotebook add`."),
        None => output.message(&format!("No quotes in category '{}'.", filter)),
    }

    Ok(())
}

fn resolve_filter(store: &Store, category: Option<&str>) -> CategoryFilter {
    category
        .map(CategoryFilter::parse)
        .unwrap_or_else(|| store.current_filter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_add_appends_quote() {
        let mut store = Store::in_memory();
        add(&mut store, "Less is more.", "Design", &quiet()).unwrap();

        assert_eq!(store.len(), 5);
        assert_eq!(store.all().last().unwrap().category, "Design");
    }

    #[test]
    fn test_add_rejects_blank_text() {
        let mut store = Store::in_memory();
        assert!(add(&mut store, "   ", "Design", &quiet()).is_err());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_resolve_filter_prefers_argument() {
        let mut store = Store::in_memory();
        store.set_filter("Life").unwrap();

        assert_eq!(
            resolve_filter(&store, None),
            CategoryFilter::Category("Life".to_string())
        );
        assert_eq!(resolve_filter(&store, Some("all")), CategoryFilter::All);
        assert_eq!(
            resolve_filter(&store, Some("Wisdom")),
            CategoryFilter::Category("Wisdom".to_string())
        );
    }

    #[test]
    fn test_show_with_unknown_category_is_not_an_error() {
        let mut store = Store::in_memory();
        assert!(show(&mut store, Some("Nope".to_string()), &quiet()).is_ok());
        assert!(store.last_displayed().is_none());
    }
}
