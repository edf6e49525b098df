use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use jobsignal_core::types::{CanonicalPostingId, DeliveryStage, UserId};
use jobsignal_core::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::DeliveryHistoryRow;

pub struct DeliveryHistoryRepo {
    db: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

impl DeliveryHistoryRepo {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn exists(&self, user_id: UserId, posting_id: CanonicalPostingId) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let found: Option<i64> = db
            .query_row(
                "SELECT 1 FROM delivery_history WHERE user_id = ?1 AND canonical_posting_id = ?2",
                params![user_id.to_string(), posting_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Inserts a history row *before* the outbound send. The unique (user,
    /// job) constraint is the deduplication mechanism: a race that
    /// attempts two inserts resolves to exactly one `Inserted` outcome;
    /// the loser gets `AlreadyExists` and must not send.
    pub fn insert_before_send(
        &self,
        user_id: UserId,
        posting_id: CanonicalPostingId,
        score: f64,
        stage: DeliveryStage,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "INSERT OR IGNORE INTO delivery_history
                (user_id, canonical_posting_id, score, stage, sent, shown_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                user_id.to_string(),
                posting_id.to_string(),
                score,
                stage.as_str(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(if changed == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        })
    }

    pub fn mark_sent(&self, user_id: UserId, posting_id: CanonicalPostingId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE delivery_history SET sent = 1, error = NULL
             WHERE user_id = ?1 AND canonical_posting_id = ?2",
            params![user_id.to_string(), posting_id.to_string()],
        )?;
        Ok(())
    }

    pub fn mark_send_failed(
        &self,
        user_id: UserId,
        posting_id: CanonicalPostingId,
        error: &str,
    ) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE delivery_history SET sent = 0, error = ?1
             WHERE user_id = ?2 AND canonical_posting_id = ?3",
            params![error, user_id.to_string(), posting_id.to_string()],
        )?;
        Ok(())
    }

    /// Count of rows with `shown_at` on `day` (local calendar date as
    /// passed by the caller), for the daily-cap check.
    pub fn count_for_day(&self, user_id: UserId, day: NaiveDate) -> Result<u32> {
        let db = self.db.lock().unwrap();
        let start = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = start + chrono::Duration::days(1);
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM delivery_history
             WHERE user_id = ?1 AND shown_at >= ?2 AND shown_at < ?3",
            params![user_id.to_string(), start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(n as u32)
    }

    pub fn find(
        &self,
        user_id: UserId,
        posting_id: CanonicalPostingId,
    ) -> Result<Option<DeliveryHistoryRow>> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                "SELECT user_id, canonical_posting_id, score, stage, sent, shown_at
                 FROM delivery_history WHERE user_id = ?1 AND canonical_posting_id = ?2",
                params![user_id.to_string(), posting_id.to_string()],
                Self::row_to_history,
            )
            .optional()?;
        Ok(row)
    }

    fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeliveryHistoryRow> {
        let user_id: String = row.get(0)?;
        let posting_id: String = row.get(1)?;
        let stage: String = row.get(3)?;
        let shown_at: String = row.get(5)?;
        Ok(DeliveryHistoryRow {
            user_id: UserId::from_str(&user_id).unwrap_or_default(),
            canonical_posting_id: CanonicalPostingId::from_str(&posting_id).unwrap_or_default(),
            score: row.get(2)?,
            stage: if stage == "back_fill" {
                DeliveryStage::BackFill
            } else {
                DeliveryStage::RealTime
            },
            sent: row.get::<_, i64>(4)? != 0,
            shown_at: shown_at.parse().unwrap_or_else(|_| Utc::now()),
        })
    }

    pub fn count_sent_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM delivery_history WHERE sent = 1 AND shown_at >= ?1",
            params![since.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
