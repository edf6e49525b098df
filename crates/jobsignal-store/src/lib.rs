//! Logical persistence API over SQLite: typed repository structs, one per
//! entity, aggregated behind a single `Store`.

pub mod canonical_postings;
pub mod delivery_history;
pub mod entities;
pub mod preferences;
pub mod raw_postings;
pub mod reminders;
pub mod schema;
pub mod users;
pub mod vector;
pub mod windows;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use canonical_postings::CanonicalPostingRepo;
use delivery_history::DeliveryHistoryRepo;
use preferences::PreferenceRepo;
use raw_postings::RawPostingRepo;
use reminders::ReminderLogRepo;
use users::UserRepo;
use windows::WindowRepo;

/// Aggregates every repo behind one constructor that also runs `init_db`,
/// so callers open one connection and get every subsystem wired to it.
pub struct Store {
    pub users: UserRepo,
    pub preferences: PreferenceRepo,
    pub raw_postings: RawPostingRepo,
    pub canonical_postings: CanonicalPostingRepo,
    pub delivery_history: DeliveryHistoryRepo,
    pub windows: WindowRepo,
    pub reminder_log: ReminderLogRepo,
}

impl Store {
    pub fn open(conn: Connection) -> jobsignal_core::Result<Self> {
        schema::init_db(&conn)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            users: UserRepo::new(conn.clone()),
            preferences: PreferenceRepo::new(conn.clone()),
            raw_postings: RawPostingRepo::new(conn.clone()),
            canonical_postings: CanonicalPostingRepo::new(conn.clone()),
            delivery_history: DeliveryHistoryRepo::new(conn.clone()),
            windows: WindowRepo::new(conn.clone()),
            reminder_log: ReminderLogRepo::new(conn),
        })
    }

    pub fn open_in_memory() -> jobsignal_core::Result<Self> {
        Self::open(Connection::open_in_memory()?)
    }
}
