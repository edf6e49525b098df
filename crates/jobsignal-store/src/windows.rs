use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use jobsignal_core::types::{ReminderStage, UserId, WindowId, WindowStatus};
use jobsignal_core::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::ConversationWindow;

fn stage_column(stage: ReminderStage) -> &'static str {
    match stage {
        ReminderStage::S1 => "stage_s1_sent",
        ReminderStage::S2 => "stage_s2_sent",
        ReminderStage::S3 => "stage_s3_sent",
        ReminderStage::S4 => "stage_s4_sent",
        ReminderStage::S5 => "stage_s5_sent",
    }
}

fn row_to_window(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationWindow> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let started_at: String = row.get(2)?;
    let last_activity_at: String = row.get(3)?;
    let status: String = row.get(4)?;

    let mut stages_sent = Vec::new();
    for (idx, stage) in ReminderStage::ALL.iter().enumerate() {
        let sent: i64 = row.get(5 + idx)?;
        if sent != 0 {
            stages_sent.push(*stage);
        }
    }

    Ok(ConversationWindow {
        id: WindowId::from_str(&id).unwrap_or_default(),
        user_id: UserId::from_str(&user_id).unwrap_or_default(),
        started_at: started_at.parse().unwrap_or_else(|_| Utc::now()),
        last_activity_at: last_activity_at.parse().unwrap_or_else(|_| Utc::now()),
        status: if status == "expired" {
            WindowStatus::Expired
        } else {
            WindowStatus::Active
        },
        stages_sent,
        messages_in_window: row.get(10)?,
    })
}

const WINDOW_SELECT_SQL: &str = "SELECT id, user_id, started_at, last_activity_at, status,
    stage_s1_sent, stage_s2_sent, stage_s3_sent, stage_s4_sent, stage_s5_sent,
    messages_in_window FROM conversation_windows";

pub struct WindowRepo {
    db: Arc<Mutex<Connection>>,
}

impl WindowRepo {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn find_active(&self, user_id: UserId) -> Result<Option<ConversationWindow>> {
        let db = self.db.lock().unwrap();
        let window = db
            .query_row(
                &format!("{WINDOW_SELECT_SQL} WHERE user_id = ?1 AND status = 'active'"),
                params![user_id.to_string()],
                row_to_window,
            )
            .optional()?;
        Ok(window)
    }

    /// Opens a new window for `user_id`, atomically closing any prior
    /// active one first. Called on every inbound message; if a window is
    /// already active, this just bumps its `last_activity_at` and message
    /// counter instead of opening a second one.
    pub fn open_or_bump(&self, user_id: UserId, now: DateTime<Utc>) -> Result<ConversationWindow> {
        let db = self.db.lock().unwrap();
        let existing = db
            .query_row(
                &format!("{WINDOW_SELECT_SQL} WHERE user_id = ?1 AND status = 'active'"),
                params![user_id.to_string()],
                row_to_window,
            )
            .optional()?;

        if let Some(mut window) = existing {
            db.execute(
                "UPDATE conversation_windows
                 SET last_activity_at = ?1, messages_in_window = messages_in_window + 1
                 WHERE id = ?2",
                params![now.to_rfc3339(), window.id.to_string()],
            )?;
            window.last_activity_at = now;
            window.messages_in_window += 1;
            return Ok(window);
        }

        db.execute(
            "UPDATE conversation_windows SET status = 'expired'
             WHERE user_id = ?1 AND status = 'active'",
            params![user_id.to_string()],
        )?;

        let id = WindowId::new();
        db.execute(
            "INSERT INTO conversation_windows
                (id, user_id, started_at, last_activity_at, status, messages_in_window)
             VALUES (?1, ?2, ?3, ?3, 'active', 1)",
            params![id.to_string(), user_id.to_string(), now.to_rfc3339()],
        )?;

        Ok(ConversationWindow {
            id,
            user_id,
            started_at: now,
            last_activity_at: now,
            status: WindowStatus::Active,
            stages_sent: Vec::new(),
            messages_in_window: 1,
        })
    }

    pub fn expire(&self, window_id: WindowId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE conversation_windows SET status = 'expired' WHERE id = ?1",
            params![window_id.to_string()],
        )?;
        Ok(())
    }

    /// Conditional update that marks `stage` sent only if it hasn't been
    /// already — the row-level lock substitute ("update … where
    /// stage_N_sent=false"). Returns `true` iff this call was the one
    /// that flipped it.
    pub fn try_mark_stage_sent(&self, window_id: WindowId, stage: ReminderStage) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let column = stage_column(stage);
        let changed = db.execute(
            &format!(
                "UPDATE conversation_windows SET {column} = 1
                 WHERE id = ?1 AND {column} = 0"
            ),
            params![window_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// All windows still marked active, for the Reminder Daemon's scan.
    /// Includes windows whose elapsed time has already crossed 24h but
    /// haven't been flipped to expired yet by this pass.
    pub fn all_active(&self) -> Result<Vec<ConversationWindow>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!("{WINDOW_SELECT_SQL} WHERE status = 'active'"))?;
        let rows = stmt
            .query_map([], row_to_window)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> WindowRepo {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init_db(&conn).unwrap();
        WindowRepo::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn opening_new_window_closes_prior_active_one() {
        let repo = test_repo();
        let user = UserId::new();
        let t0 = Utc::now();
        let w1 = repo.open_or_bump(user, t0).unwrap();

        repo.expire(w1.id).unwrap();
        let w2 = repo.open_or_bump(user, t0 + chrono::Duration::hours(25)).unwrap();
        assert_ne!(w1.id, w2.id);

        let active = repo.all_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, w2.id);
    }

    #[test]
    fn repeated_inbound_bumps_same_window_instead_of_opening_new() {
        let repo = test_repo();
        let user = UserId::new();
        let t0 = Utc::now();
        let w1 = repo.open_or_bump(user, t0).unwrap();
        let w2 = repo
            .open_or_bump(user, t0 + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(w1.id, w2.id);
        assert_eq!(w2.messages_in_window, 2);
    }

    #[test]
    fn try_mark_stage_sent_is_idempotent() {
        let repo = test_repo();
        let user = UserId::new();
        let w = repo.open_or_bump(user, Utc::now()).unwrap();
        let first = repo.try_mark_stage_sent(w.id, ReminderStage::S1).unwrap();
        let second = repo.try_mark_stage_sent(w.id, ReminderStage::S1).unwrap();
        assert!(first);
        assert!(!second);
    }
}
