use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use jobsignal_core::types::{ReminderStage, UserId, WindowId};
use jobsignal_core::Result;
use rusqlite::{params, Connection};

pub struct ReminderLogRepo {
    db: Arc<Mutex<Connection>>,
}

fn stage_str(stage: ReminderStage) -> &'static str {
    stage.as_str()
}

impl ReminderLogRepo {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Append-only idempotency ledger. The `(window_id, stage)` primary
    /// key makes a repeat append a no-op rather than an error.
    pub fn record(
        &self,
        user_id: UserId,
        window_id: WindowId,
        stage: ReminderStage,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO reminder_log (user_id, window_id, stage, sent_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id.to_string(),
                window_id.to_string(),
                stage_str(stage),
                sent_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn has_sent(&self, window_id: WindowId, stage: ReminderStage) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM reminder_log WHERE window_id = ?1 AND stage = ?2",
            params![window_id.to_string(), stage_str(stage)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> ReminderLogRepo {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init_db(&conn).unwrap();
        ReminderLogRepo::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn recording_same_stage_twice_is_a_no_op() {
        let repo = test_repo();
        let user = UserId::new();
        let window = WindowId::new();
        let now = Utc::now();
        repo.record(user, window, ReminderStage::S1, now).unwrap();
        repo.record(user, window, ReminderStage::S1, now).unwrap();
        assert!(repo.has_sent(window, ReminderStage::S1).unwrap());
    }
}
