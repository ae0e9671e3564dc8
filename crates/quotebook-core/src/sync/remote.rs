//! Remote quote sources
//!
//! A remote source returns the authoritative quote set, or fails as a whole.
//! Payload validation happens here so that a bad response never reaches
//! the store.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::error::SyncError;
use crate::config::Config;
use crate::models::Quote;

/// Where reconciliation pulls remote quotes from
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Human-readable description, used in logs
    fn describe(&self) -> String;

    /// Fetch the full remote quote set
    async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError>;
}

/// Decode and validate a remote response body
///
/// The body must be a JSON array of `{id, text, category}` objects, every
/// record must satisfy the quote invariants, and ids must be unique.
pub fn decode_payload(body: &str) -> Result<Vec<Quote>, SyncError> {
    let quotes: Vec<Quote> =
        serde_json::from_str(body).map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

    let mut seen = HashSet::with_capacity(quotes.len());
    quotes
        .into_iter()
        .map(|quote| {
            if !seen.insert(quote.id) {
                return Err(SyncError::MalformedPayload(format!(
                    "duplicate id {}",
                    quote.id
                )));
            }
            let id = quote.id;
            quote
                .validated()
                .map_err(|e| SyncError::MalformedPayload(format!("record {}: {}", id, e)))
        })
        .collect()
}

/// Fetches quotes with an HTTP GET
#[derive(Debug)]
pub struct HttpRemoteSource {
    url: String,
    client: reqwest::Client,
}

impl HttpRemoteSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quotebook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SyncError::Http {
                url: url.clone(),
                source,
            })?;

        Ok(Self { url, client })
    }

    /// Build a source from configuration, if sync is enabled and has a URL
    pub fn from_config(config: &Config) -> Option<Result<Self, SyncError>> {
        config
            .active_sync_url()
            .map(|url| Self::new(url, config.sync_timeout()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError> {
        debug!("fetching remote quotes from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| SyncError::Http {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SyncError::Http {
            url: self.url.clone(),
            source,
        })?;

        decode_payload(&body)
    }
}

/// Serves a fixed quote set (or a fixed failure) from memory
///
/// Useful for offline operation and tests.
#[derive(Debug)]
pub struct StaticRemoteSource {
    response: RwLock<Result<Vec<Quote>, String>>,
}

impl StaticRemoteSource {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self {
            response: RwLock::new(Ok(quotes)),
        }
    }

    /// A source whose every fetch fails with a transport error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: RwLock::new(Err(message.into())),
        }
    }

    /// Replace what subsequent fetches return
    pub fn set_quotes(&self, quotes: Vec<Quote>) {
        let mut response = self.response.write().unwrap_or_else(|e| e.into_inner());
        *response = Ok(quotes);
    }
}

#[async_trait]
impl RemoteSource for StaticRemoteSource {
    fn describe(&self) -> String {
        "static quote set".to_string()
    }

    async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError> {
        let response = self.response.read().unwrap_or_else(|e| e.into_inner());
        match &*response {
            Ok(quotes) => Ok(quotes.clone()),
            Err(message) => Err(SyncError::Transport(message.clone())),
        }
    }
}
