//! Quote store
//!
//! The `Store` owns the in-memory record sequence and is the only thing
//! that writes the persisted snapshot. Every mutating call persists the
//! full snapshot before returning.
//!
//! ## Storage keys
//!
//! - `quotes.json` (durable): the record snapshot
//! - `selected_category` (durable): the active filter
//! - `last_quote` (session): the most recently displayed quote
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open_with_config(&config);
//!
//! store.insert("Simplicity is the ultimate sophistication.", "Wisdom")?;
//! store.set_filter("Wisdom")?;
//!
//! let visible = store.query(&store.current_filter());
//! ```

use std::collections::HashSet;

use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{self, CategoryFilter};
use crate::models::{seed_quotes, Quote, QuoteDraft, QuoteId};
use crate::storage::{keys, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use crate::sync::SyncSummary;

/// In-memory quote collection backed by key-value persistence
pub struct Store {
    /// Records in insertion order, unique by id
    quotes: Vec<Quote>,
    /// Active category filter
    filter: CategoryFilter,
    /// Durable storage for the snapshot and preferences
    durable: Box<dyn KeyValueStore>,
    /// Storage that lives only as long as this session
    session: Box<dyn KeyValueStore>,
}

impl Store {
    /// Open the store in the configured data directory
    ///
    /// The session cache is in-memory, so it starts empty on every open.
    pub fn open_with_config(config: &Config) -> Self {
        Self::open_with_backends(
            Box::new(FileKeyValueStore::new(config.data_dir.clone())),
            Box::new(MemoryKeyValueStore::new()),
        )
    }

    /// Open the store over arbitrary storage backends
    ///
    /// Loading never fails: a missing, unreadable or malformed snapshot
    /// falls back to the built-in seed quotes.
    pub fn open_with_backends(
        mut durable: Box<dyn KeyValueStore>,
        session: Box<dyn KeyValueStore>,
    ) -> Self {
        let quotes = load_snapshot(durable.as_mut());
        let filter = load_filter(durable.as_ref());

        debug!(count = quotes.len(), filter = %filter, "store opened");

        Self {
            quotes,
            filter,
            durable,
            session,
        }
    }

    /// Open a store with no durable backing (everything in memory)
    pub fn in_memory() -> Self {
        Self::open_with_backends(
            Box::new(MemoryKeyValueStore::new()),
            Box::new(MemoryKeyValueStore::new()),
        )
    }

    // ==================== Reads ====================

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// All quotes in store order
    pub fn all(&self) -> &[Quote] {
        &self.quotes
    }

    /// Look up a quote by id
    pub fn get(&self, id: QuoteId) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    /// Quotes matching `filter`, in store order
    pub fn query(&self, filter: &CategoryFilter) -> Vec<Quote> {
        filter.apply(&self.quotes)
    }

    /// "all" followed by every distinct category, in first-appearance order
    pub fn available_categories(&self) -> Vec<String> {
        filter::available_categories(&self.quotes)
    }

    /// Categories with quote counts
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        filter::category_counts(&self.quotes)
    }

    /// Pretty-printed JSON array of every quote
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.quotes)?)
    }

    // ==================== Filter preference ====================

    pub fn current_filter(&self) -> CategoryFilter {
        self.filter.clone()
    }

    /// Change the active filter and persist it immediately
    pub fn set_filter(&mut self, value: impl Into<CategoryFilter>) -> Result<()> {
        let filter = value.into();
        self.durable
            .set(keys::SELECTED_CATEGORY, &filter.to_string())?;
        debug!(filter = %filter, "filter changed");
        self.filter = filter;
        Ok(())
    }

    // ==================== Mutations ====================

    /// Add a new local quote
    ///
    /// Fails with `Error::Validation` if text or category is blank after
    /// trimming; the store is unchanged in that case.
    pub fn insert(&mut self, text: &str, category: &str) -> Result<Quote> {
        let quote = Quote::new(next_local_id(&self.quotes)?, text, category)?;

        let mut next = self.quotes.clone();
        next.push(quote.clone());
        self.commit(next)?;

        info!(id = %quote.id, category = %quote.category, "quote added");
        Ok(quote)
    }

    /// Merge an authoritative remote record set into the store
    ///
    /// - unseen id: appended (new record)
    /// - same id, identical fields: left alone
    /// - same id, any field different: replaced by the remote record (conflict)
    ///
    /// Local quotes the remote set doesn't mention are never removed.
    /// Every remote record is validated before anything changes, and the
    /// merged sequence is persisted once at the end.
    pub fn merge(&mut self, remote: Vec<Quote>) -> Result<SyncSummary> {
        let remote = remote
            .into_iter()
            .map(Quote::validated)
            .collect::<Result<Vec<_>>>()?;

        let mut next = self.quotes.clone();
        let mut summary = SyncSummary::default();

        for incoming in remote {
            match next.iter_mut().find(|q| q.id == incoming.id) {
                None => {
                    next.push(incoming);
                    summary.new_records += 1;
                }
                Some(existing) if *existing == incoming => {
                    summary.unchanged += 1;
                }
                Some(existing) => {
                    debug!(id = %incoming.id, "remote record replaces local copy");
                    *existing = incoming;
                    summary.conflicts_resolved += 1;
                }
            }
        }

        self.commit(next)?;
        Ok(summary)
    }

    /// Append imported quotes
    ///
    /// Import is additive. Drafts without an id, or whose id is already
    /// taken (by an existing quote or an earlier draft in the same batch),
    /// get a fresh local id so the store stays unique by id.
    pub fn append_all(&mut self, drafts: Vec<QuoteDraft>) -> Result<Vec<Quote>> {
        let mut next = self.quotes.clone();
        let mut appended = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let id = match draft.id {
                Some(id) if !next.iter().any(|q| q.id == id) => id,
                Some(id) => {
                    let fresh = next_local_id(&next)?;
                    debug!(%id, %fresh, "imported id already in use, reassigning");
                    fresh
                }
                None => next_local_id(&next)?,
            };
            let quote = Quote::new(id, &draft.text, &draft.category)?;
            next.push(quote.clone());
            appended.push(quote);
        }

        self.commit(next)?;
        info!(count = appended.len(), "quotes imported");
        Ok(appended)
    }

    // ==================== Session cache ====================

    /// Pick a random quote from the filtered view and remember it
    ///
    /// Avoids repeating the previously displayed quote when there is a choice.
    pub fn random_quote(&mut self, filter: &CategoryFilter) -> Result<Option<Quote>> {
        let candidates = self.query(filter);
        let last_id = self.last_displayed().map(|q| q.id);

        let pool: Vec<&Quote> = if candidates.len() > 1 {
            candidates
                .iter()
                .filter(|q| Some(q.id) != last_id)
                .collect()
        } else {
            candidates.iter().collect()
        };

        let Some(quote) = pool.choose(&mut rand::thread_rng()).map(|q| (*q).clone()) else {
            return Ok(None);
        };

        self.session
            .set(keys::LAST_QUOTE, &serde_json::to_string(&quote)?)?;
        Ok(Some(quote))
    }

    /// The quote most recently returned by `random_quote` in this session
    pub fn last_displayed(&self) -> Option<Quote> {
        let raw = self.session.get(keys::LAST_QUOTE).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    /// Persist `next` as the full snapshot, then make it current
    ///
    /// If the write fails the in-memory sequence is left untouched.
    fn commit(&mut self, next: Vec<Quote>) -> Result<()> {
        let snapshot = serde_json::to_string(&next)?;
        self.durable.set(keys::QUOTES, &snapshot)?;
        self.quotes = next;
        Ok(())
    }
}

/// Allocate an id for a new local quote
///
/// Uses the current time in milliseconds, bumped past the highest id in
/// use so that rapid successive inserts never collide. Once a record holds
/// `i64::MAX` nothing fits above it, so the first free id from the clock
/// onwards (wrapping to 1) is used instead.
fn next_local_id(taken: &[Quote]) -> Result<QuoteId> {
    let now = Utc::now().timestamp_millis().max(1);
    let highest = taken.iter().map(|q| q.id.as_i64()).max().unwrap_or(0);

    if let Some(above) = highest.checked_add(1) {
        return Ok(QuoteId(now.max(above)));
    }

    let used: HashSet<i64> = taken.iter().map(|q| q.id.as_i64()).collect();
    (now..=i64::MAX)
        .chain(1..now)
        .find(|id| !used.contains(id))
        .map(QuoteId)
        .ok_or(Error::IdsExhausted)
}

/// Read the snapshot, falling back to seeds on any problem
fn load_snapshot(durable: &mut dyn KeyValueStore) -> Vec<Quote> {
    let raw = match durable.get(keys::QUOTES) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no snapshot found, starting from seed quotes");
            return seed_quotes();
        }
        Err(e) => {
            warn!("could not read snapshot, starting from seed quotes: {}", e);
            return seed_quotes();
        }
    };

    match parse_snapshot(&raw) {
        Ok(quotes) => quotes,
        Err(e) => {
            warn!("snapshot is malformed, starting from seed quotes: {}", e);
            if let Err(e) = durable.set(keys::CORRUPT_BACKUP, &raw) {
                warn!("could not back up malformed snapshot: {}", e);
            }
            seed_quotes()
        }
    }
}

fn parse_snapshot(raw: &str) -> Result<Vec<Quote>> {
    let quotes: Vec<Quote> =
        serde_json::from_str(raw).map_err(|e| Error::Format(e.to_string()))?;
    let quotes = quotes
        .into_iter()
        .map(Quote::validated)
        .collect::<Result<Vec<_>>>()?;

    for (i, quote) in quotes.iter().enumerate() {
        if quotes[..i].iter().any(|q| q.id == quote.id) {
            return Err(Error::Format(format!("duplicate id {}", quote.id)));
        }
    }
    Ok(quotes)
}

fn load_filter(durable: &dyn KeyValueStore) -> CategoryFilter {
    match durable.get(keys::SELECTED_CATEGORY) {
        Ok(Some(raw)) => CategoryFilter::parse(&raw),
        Ok(None) => CategoryFilter::All,
        Err(e) => {
            warn!("could not read selected category: {}", e);
            CategoryFilter::All
        }
    }
}
