//! Ingestion Queue: `processed=false` on raw postings IS the queue — there
//! is no in-memory buffer. This module is the thin façade other crates
//! call instead of reaching into `jobsignal-store` directly.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use jobsignal_core::Result;
use jobsignal_store::raw_postings::{EnqueueOutcome, RawPostingRepo};

use crate::adapter::ScrapedPosting;

pub struct IngestionQueue {
    raw_postings: RawPostingRepo,
}

impl IngestionQueue {
    pub fn new(raw_postings: RawPostingRepo) -> Self {
        Self { raw_postings }
    }

    /// `Enqueue` contract: dedups on (source, source_id); repeat enqueues
    /// are idempotent no-ops that return `Duplicate`.
    pub fn enqueue(&self, posting: &ScrapedPosting) -> Result<EnqueueOutcome> {
        let (_id, outcome) = self.raw_postings.enqueue(
            &posting.source,
            &posting.source_id,
            &posting.payload,
            &posting.url,
            posting.scraped_at,
        )?;
        match outcome {
            EnqueueOutcome::Inserted => info!(source = %posting.source, source_id = %posting.source_id, "raw posting enqueued"),
            EnqueueOutcome::Duplicate => debug!(source = %posting.source, source_id = %posting.source_id, "duplicate enqueue ignored"),
        }
        Ok(outcome)
    }

    pub fn enqueue_batch(&self, postings: &[ScrapedPosting]) -> Result<(usize, usize)> {
        let mut inserted = 0;
        let mut duplicate = 0;
        for posting in postings {
            match self.enqueue(posting)? {
                EnqueueOutcome::Inserted => inserted += 1,
                EnqueueOutcome::Duplicate => duplicate += 1,
            }
        }
        Ok((inserted, duplicate))
    }

    pub fn received_count(&self) -> Result<i64> {
        self.raw_postings.count_total()
    }

    pub fn processed_count(&self) -> Result<i64> {
        self.raw_postings.count_processed()
    }

    /// Exposed for the Scheduler's cold-storage sweep — cold storage after
    /// 60 days is optional. Not wired to any destructive action by default.
    pub fn is_eligible_for_cold_storage(scraped_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - scraped_at >= chrono::Duration::days(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn test_queue() -> IngestionQueue {
        let conn = Connection::open_in_memory().unwrap();
        jobsignal_store::schema::init_db(&conn).unwrap();
        IngestionQueue::new(RawPostingRepo::new(Arc::new(Mutex::new(conn))))
    }

    fn sample(source_id: &str) -> ScrapedPosting {
        ScrapedPosting {
            source: "indeed".into(),
            source_id: source_id.into(),
            payload: serde_json::json!({"title": "Sales Executive"}),
            url: "https://example.com/job/1".into(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn enqueue_dedupes_on_source_and_source_id() {
        let queue = test_queue();
        let posting = sample("abc");
        assert_eq!(queue.enqueue(&posting).unwrap(), EnqueueOutcome::Inserted);
        assert_eq!(queue.enqueue(&posting).unwrap(), EnqueueOutcome::Duplicate);
        assert_eq!(queue.received_count().unwrap(), 1);
    }

    #[test]
    fn enqueue_batch_counts_inserted_and_duplicate() {
        let queue = test_queue();
        let postings = vec![sample("a"), sample("a"), sample("b")];
        let (inserted, duplicate) = queue.enqueue_batch(&postings).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(duplicate, 1);
    }
}
