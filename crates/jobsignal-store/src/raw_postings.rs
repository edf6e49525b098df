use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use jobsignal_core::types::RawPostingId;
use jobsignal_core::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::RawPosting;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Inserted,
    Duplicate,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPosting> {
    let id: String = row.get(0)?;
    let payload: String = row.get(3)?;
    let scraped_at: String = row.get(5)?;
    Ok(RawPosting {
        id: RawPostingId::from_str(&id).unwrap_or_default(),
        source: row.get(1)?,
        source_id: row.get(2)?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        url: row.get(4)?,
        scraped_at: scraped_at.parse().unwrap_or_else(|_| Utc::now()),
        processed: row.get::<_, i64>(6)? != 0,
        error: row.get(7)?,
    })
}

const RAW_SELECT_SQL: &str =
    "SELECT id, source, source_id, payload, url, scraped_at, processed, error FROM raw_postings";

pub struct RawPostingRepo {
    db: Arc<Mutex<Connection>>,
}

impl RawPostingRepo {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// `Enqueue` contract: idempotent on (source, source_id).
    pub fn enqueue(
        &self,
        source: &str,
        source_id: &str,
        payload: &serde_json::Value,
        url: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<(RawPostingId, EnqueueOutcome)> {
        let db = self.db.lock().unwrap();
        let existing: Option<String> = db
            .query_row(
                "SELECT id FROM raw_postings WHERE source = ?1 AND source_id = ?2",
                params![source, source_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok((
                RawPostingId::from_str(&id).unwrap_or_default(),
                EnqueueOutcome::Duplicate,
            ));
        }

        let id = RawPostingId::new();
        db.execute(
            "INSERT INTO raw_postings (id, source, source_id, payload, url, scraped_at, processed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                id.to_string(),
                source,
                source_id,
                payload.to_string(),
                url,
                scraped_at.to_rfc3339(),
            ],
        )?;
        Ok((id, EnqueueOutcome::Inserted))
    }

    /// Up to `limit` unprocessed postings ordered by `scraped_at`
    /// ascending.
    pub fn pull_unprocessed_batch(&self, limit: usize) -> Result<Vec<RawPosting>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{RAW_SELECT_SQL} WHERE processed = 0 ORDER BY scraped_at ASC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_raw)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn mark_processed(&self, id: RawPostingId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE raw_postings SET processed = 1, error = NULL WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Records an enrichment failure; `processed` stays false so the next
    /// batch retries it.
    pub fn mark_failed(&self, id: RawPostingId, error: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE raw_postings SET error = ?1 WHERE id = ?2",
            params![error, id.to_string()],
        )?;
        Ok(())
    }

    pub fn count_total(&self) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row("SELECT COUNT(*) FROM raw_postings", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn count_processed(&self) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM raw_postings WHERE processed = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> RawPostingRepo {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init_db(&conn).unwrap();
        RawPostingRepo::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn enqueue_same_source_id_twice_is_idempotent() {
        let repo = test_repo();
        let payload = serde_json::json!({"title": "Sales Executive"});
        let (id1, outcome1) = repo
            .enqueue("indeed", "abc123", &payload, "https://x", Utc::now())
            .unwrap();
        let (id2, outcome2) = repo
            .enqueue("indeed", "abc123", &payload, "https://x", Utc::now())
            .unwrap();
        assert_eq!(id1, id2);
        assert_eq!(outcome1, EnqueueOutcome::Inserted);
        assert_eq!(outcome2, EnqueueOutcome::Duplicate);
        assert_eq!(repo.count_total().unwrap(), 1);
    }

    #[test]
    fn pull_unprocessed_batch_orders_by_scraped_at() {
        let repo = test_repo();
        let payload = serde_json::json!({});
        let t0 = Utc::now();
        repo.enqueue("a", "1", &payload, "u", t0 + chrono::Duration::seconds(10))
            .unwrap();
        repo.enqueue("a", "2", &payload, "u", t0).unwrap();

        let batch = repo.pull_unprocessed_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].source_id, "2");
    }

    #[test]
    fn mark_failed_leaves_processed_false_for_retry() {
        let repo = test_repo();
        let payload = serde_json::json!({});
        let (id, _) = repo.enqueue("a", "1", &payload, "u", Utc::now()).unwrap();
        repo.mark_failed(id, "schema violation").unwrap();
        let batch = repo.pull_unprocessed_batch(10).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].error.as_deref(), Some("schema violation"));
    }
}
