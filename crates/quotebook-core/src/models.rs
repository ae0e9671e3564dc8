//! Data models for Quotebook
//!
//! Defines the `Quote` record, its identity type, and the built-in seed set
//! used when no snapshot has been persisted yet.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::is_reserved_category;

/// Identity of a quote
///
/// Locally created quotes get ids in the millisecond-timestamp range;
/// remote quotes carry whatever integer the remote system assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub i64);

impl QuoteId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for QuoteId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A quote tagged with a category
///
/// `text` and `category` are always stored trimmed and non-empty.
/// Equality is field-for-field, which is what reconciliation uses to
/// tell an unchanged record from a conflicting one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub id: QuoteId,
    pub text: String,
    pub category: String,
}

impl Quote {
    /// Build a quote, trimming and validating both fields
    pub fn new(id: QuoteId, text: &str, category: &str) -> Result<Self> {
        let text = text.trim();
        let category = category.trim();

        if text.is_empty() {
            return Err(Error::Validation("quote text must not be empty".into()));
        }
        if category.is_empty() {
            return Err(Error::Validation("quote category must not be empty".into()));
        }
        if is_reserved_category(category) {
            return Err(Error::Validation(format!(
                "\"{}\" is reserved for selecting every category",
                category
            )));
        }

        Ok(Self {
            id,
            text: text.to_string(),
            category: category.to_string(),
        })
    }

    /// Re-check the invariants on a value that bypassed `new`
    /// (typically one produced by deserialization)
    pub fn validated(self) -> Result<Self> {
        Self::new(self.id, &self.text, &self.category)
    }

    /// Whether this quote belongs to `category` (exact match)
    pub fn in_category(&self, category: &str) -> bool {
        self.category == category
    }
}

/// A quote that has not been given a place in the store yet
///
/// This is the wire shape accepted on import: like `Quote`, but `id` may
/// be absent and the fields have not been validated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuoteDraft {
    #[serde(default)]
    pub id: Option<QuoteId>,
    pub text: String,
    pub category: String,
}

impl QuoteDraft {
    pub fn new(id: Option<QuoteId>, text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            category: category.into(),
        }
    }

    /// Whether this draft would pass `Quote::new`
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
            && !self.category.trim().is_empty()
            && !is_reserved_category(&self.category)
    }
}

/// The quotes a fresh store starts with
pub fn seed_quotes() -> Vec<Quote> {
    [
        (
            1,
            "The only way to do great work is to love what you do.",
            "Motivation",
        ),
        (
            2,
            "Life is what happens when you're busy making other plans.",
            "Life",
        ),
        (
            3,
            "In the middle of difficulty lies opportunity.",
            "Inspiration",
        ),
        (
            4,
            "Simplicity is the ultimate sophistication.",
            "Wisdom",
        ),
    ]
    .into_iter()
    .map(|(id, text, category)| Quote {
        id: QuoteId(id),
        text: text.to_string(),
        category: category.to_string(),
    })
    .collect()
}
