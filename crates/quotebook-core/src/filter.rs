//! Category filtering
//!
//! A filter is either the synthetic "all" selector or one category name.
//! Categories themselves are never stored; they are projected from the
//! quotes on demand, in order of first appearance.

use std::fmt;
use std::str::FromStr;

use crate::models::Quote;

/// Name of the synthetic selector that matches every quote
pub const ALL_CATEGORIES: &str = "all";

/// Whether `name` would be read back as the "all" selector
///
/// Such names can't be selected on their own, so quotes may not use them.
pub fn is_reserved_category(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(ALL_CATEGORIES)
}

/// The active category selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// Parse a user-supplied selector. Empty input and "all" (any case) mean `All`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || is_reserved_category(value) {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(value.to_string())
        }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(category) => quote.in_category(category),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CategoryFilter::All)
    }

    /// Ordered subsequence of `quotes` matching this filter
    pub fn apply(&self, quotes: &[Quote]) -> Vec<Quote> {
        quotes.iter().filter(|q| self.matches(q)).cloned().collect()
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL_CATEGORIES),
            CategoryFilter::Category(category) => f.write_str(category),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Distinct categories in order of first appearance, without the "all" selector
pub fn distinct_categories(quotes: &[Quote]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for quote in quotes {
        if !categories.iter().any(|c| c == &quote.category) {
            categories.push(quote.category.clone());
        }
    }
    categories
}

/// Selector choices for a UI: "all" followed by every distinct category
pub fn available_categories(quotes: &[Quote]) -> Vec<String> {
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct_categories(quotes))
        .collect()
}

/// Category names with the number of quotes in each, in first-appearance order
pub fn category_counts(quotes: &[Quote]) -> Vec<(String, usize)> {
    distinct_categories(quotes)
        .into_iter()
        .map(|category| {
            let count = quotes.iter().filter(|q| q.in_category(&category)).count();
            (category, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteId;

    fn quotes() -> Vec<Quote> {
        vec![
            Quote::new(QuoteId(1), "A", "X").unwrap(),
            Quote::new(QuoteId(2), "B", "Y").unwrap(),
            Quote::new(QuoteId(3), "C", "X").unwrap(),
        ]
    }

    #[test]
    fn test_parse() {
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("ALL"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("  "), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse(" Life "),
            CategoryFilter::Category("Life".to_string())
        );
    }

    #[test]
    fn test_reserved_category() {
        assert!(is_reserved_category("all"));
        assert!(is_reserved_category(" All "));
        assert!(!is_reserved_category("Allergies"));
        assert!(!is_reserved_category("Wisdom"));
    }

    #[test]
    fn test_display_round_trips() {
        for raw in ["all", "Life"] {
            assert_eq!(CategoryFilter::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_apply_keeps_order() {
        let filtered = CategoryFilter::parse("X").apply(&quotes());
        let ids: Vec<i64> = filtered.iter().map(|q| q.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_apply_all() {
        assert_eq!(CategoryFilter::All.apply(&quotes()).len(), 3);
    }

    #[test]
    fn test_apply_unknown_category_is_empty() {
        assert!(CategoryFilter::parse("Z").apply(&quotes()).is_empty());
    }

    #[test]
    fn test_available_categories() {
        assert_eq!(available_categories(&quotes()), vec!["all", "X", "Y"]);
        assert_eq!(available_categories(&[]), vec!["all"]);
    }

    #[test]
    fn test_category_counts() {
        assert_eq!(
            category_counts(&quotes()),
            vec![("X".to_string(), 2), ("Y".to_string(), 1)]
        );
    }
}
