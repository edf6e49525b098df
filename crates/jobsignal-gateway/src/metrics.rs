//! Gated metrics endpoint: a `DashMap`-backed in-process counter registry
//! rendered as JSON rather than a full Prometheus exporter.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Value};

use jobsignal_store::Store;

/// Process-local counters that don't round-trip through the store (e.g.
/// webhook requests seen). Store-backed figures are computed on read
/// instead of double-bookkept here.
#[derive(Default)]
pub struct MetricsRegistry {
    counters: DashMap<&'static str, u64>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, name: &'static str) {
        *self.counters.entry(name).or_insert(0) += 1;
    }

    fn get(&self, name: &str) -> u64 {
        self.counters.get(name).map(|v| *v).unwrap_or(0)
    }

    /// Renders every counter. Store-backed figures are queried live; a
    /// store error degrades that single field to `null` rather than
    /// failing the whole response.
    pub fn render(&self, store: &Arc<Store>) -> Value {
        let now = Utc::now();
        let since_24h = now - chrono::Duration::hours(24);
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let recency_cutoff = now - chrono::Duration::days(60);

        let users_total = store.users.count_total().ok();
        let users_active_24h = store.users.count_active_since(since_24h).ok();
        let raw_received = store.raw_postings.count_total().ok();
        let raw_processed = store.raw_postings.count_processed().ok();
        let canonical_created = store.canonical_postings.count_total().ok();
        let alerts_sent_today = store.delivery_history.count_sent_since(today_start).ok();

        let embedding_coverage_users = coverage_pct(
            store.preferences.all_with_embedding().ok().map(|v| v.len() as i64),
            users_total,
        );
        let embedding_coverage_postings = coverage_pct(
            store.canonical_postings.count_with_embedding().ok(),
            canonical_created,
        );

        let avg_latency_ms = store
            .canonical_postings
            .recent_with_embedding(recency_cutoff)
            .ok()
            .map(|postings| average_enrichment_latency_ms(&postings));

        json!({
            "users_total": users_total,
            "users_active_24h": users_active_24h,
            "raw_postings_received": raw_received,
            "raw_postings_processed": raw_processed,
            "canonical_postings_created": canonical_created,
            "alerts_sent_today": alerts_sent_today,
            "embedding_coverage_users_pct": embedding_coverage_users,
            "embedding_coverage_postings_pct": embedding_coverage_postings,
            "avg_end_to_end_enrichment_latency_ms": avg_latency_ms,
            "webhook_requests_received": self.get("webhook_requests_received"),
            "webhook_requests_rejected": self.get("webhook_requests_rejected"),
        })
    }
}

fn coverage_pct(with: Option<i64>, total: Option<i64>) -> Option<f64> {
    match (with, total) {
        (Some(_), Some(0)) => Some(0.0),
        (Some(w), Some(t)) => Some((w as f64 / t as f64) * 100.0),
        _ => None,
    }
}

/// Average of `embedding.generated_at - scraped_at` across the candidate
/// set. `generated_at` is written at the moment the embedding lands, the
/// last step of the enrichment pipeline for that record.
fn average_enrichment_latency_ms(postings: &[jobsignal_store::entities::CanonicalPosting]) -> f64 {
    let durations: Vec<Duration> = postings
        .iter()
        .filter_map(|p| {
            let embedding = p.embedding.as_ref()?;
            (embedding.generated_at - p.scraped_at).to_std().ok()
        })
        .collect();
    if durations.is_empty() {
        return 0.0;
    }
    let total_ms: u128 = durations.iter().map(|d| d.as_millis()).sum();
    total_ms as f64 / durations.len() as f64
}
