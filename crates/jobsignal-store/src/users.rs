use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use jobsignal_core::types::UserId;
use jobsignal_core::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::User;

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    use std::str::FromStr;
    let id: String = row.get(0)?;
    let created_at: String = row.get(4)?;
    let last_active_at: String = row.get(5)?;
    Ok(User {
        id: UserId::from_str(&id).unwrap_or_default(),
        handle: row.get(1)?,
        display_name: row.get(2)?,
        is_active: row.get::<_, i64>(3)? != 0,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        last_active_at: last_active_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

const USER_SELECT_SQL: &str =
    "SELECT id, handle, display_name, is_active, created_at, last_active_at FROM users";

pub struct UserRepo {
    db: Arc<Mutex<Connection>>,
}

impl UserRepo {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Finds the user for a chat handle, creating one if this is the
    /// first inbound message ever seen from it.
    pub fn find_or_create_by_handle(&self, handle: &str, now: DateTime<Utc>) -> Result<User> {
        let db = self.db.lock().unwrap();
        if let Some(user) = Self::find_by_handle_locked(&db, handle)? {
            return Ok(user);
        }
        let id = UserId::new();
        db.execute(
            "INSERT INTO users (id, handle, display_name, is_active, created_at, last_active_at)
             VALUES (?1, ?2, NULL, 1, ?3, ?3)",
            params![id.to_string(), handle, now.to_rfc3339()],
        )?;
        Ok(User {
            id,
            handle: handle.to_string(),
            display_name: None,
            is_active: true,
            created_at: now,
            last_active_at: now,
        })
    }

    pub fn find_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        Self::find_by_handle_locked(&db, handle)
    }

    fn find_by_handle_locked(db: &Connection, handle: &str) -> Result<Option<User>> {
        let user = db
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE handle = ?1"),
                params![handle],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        let user = db
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn touch_last_active(&self, id: UserId, now: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE users SET last_active_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn deactivate(&self, id: UserId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE users SET is_active = 0 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// All active users with confirmed preferences, for cohort queries in
    /// the Delivery Dispatcher (eligibility predicate 1).
    pub fn active_confirmed_user_ids(&self) -> Result<Vec<UserId>> {
        use std::str::FromStr;
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT u.id FROM users u
             JOIN preferences p ON p.user_id = u.id
             WHERE u.is_active = 1 AND p.confirmed = 1",
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|s| UserId::from_str(&s).ok())
            .collect();
        Ok(ids)
    }

    pub fn count_active_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM users WHERE last_active_at >= ?1",
            params![since.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_total(&self) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let count: i64 = db.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> UserRepo {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init_db(&conn).unwrap();
        UserRepo::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn find_or_create_is_idempotent_per_handle() {
        let repo = test_repo();
        let now = Utc::now();
        let a = repo.find_or_create_by_handle("+2348012345678", now).unwrap();
        let b = repo.find_or_create_by_handle("+2348012345678", now).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn touch_last_active_updates_timestamp() {
        let repo = test_repo();
        let t0 = Utc::now();
        let user = repo.find_or_create_by_handle("+234", t0).unwrap();
        let t1 = t0 + chrono::Duration::hours(1);
        repo.touch_last_active(user.id, t1).unwrap();
        let reloaded = repo.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(reloaded.last_active_at.timestamp(), t1.timestamp());
    }
}
