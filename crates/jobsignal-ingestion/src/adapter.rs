//! Scraper adapters are external collaborators: only their emitted record
//! shape matters to this system, not their internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The record shape every scraper adapter emits, regardless of the site it
/// scrapes. `payload` is the opaque JSON blob carried verbatim into the raw
/// posting row for the Enrichment Worker to mine for hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPosting {
    pub source: String,
    pub source_id: String,
    pub payload: serde_json::Value,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
}

/// Implemented by each heterogeneous scraper source. The ingestion queue
/// drains whatever an adapter yields without flow control; the adapter
/// itself decides its own polling cadence and upstream protocol.
pub trait ScraperAdapter: Send + Sync {
    fn source_name(&self) -> &str;
}

/// Convenience fake for wiring tests and the gateway's local dev mode: a
/// fixed in-memory list of scraped postings replayed on demand.
pub struct StaticAdapter {
    pub name: String,
    pub postings: Vec<ScrapedPosting>,
}

impl ScraperAdapter for StaticAdapter {
    fn source_name(&self) -> &str {
        &self.name
    }
}
