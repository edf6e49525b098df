use rusqlite::Connection;

/// Idempotent schema initialization for every subsystem this crate owns.
/// Safe to call on every process start.
///
/// SQLite has no GIN or IVF-flat index type; array-field lookups here are
/// done by loading the filtered candidate set and scanning in Rust rather
/// than via a specialized index.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    create_users_table(conn)?;
    create_preferences_table(conn)?;
    create_raw_postings_table(conn)?;
    create_canonical_postings_table(conn)?;
    create_delivery_history_table(conn)?;
    create_conversation_windows_table(conn)?;
    create_reminder_log_table(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY NOT NULL,
            handle          TEXT NOT NULL UNIQUE,
            display_name    TEXT,
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            last_active_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_handle ON users (handle);",
    )
}

fn create_preferences_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS preferences (
            user_id                 TEXT PRIMARY KEY NOT NULL REFERENCES users(id),
            desired_roles           TEXT NOT NULL DEFAULT '[]',
            job_categories          TEXT NOT NULL DEFAULT '[]',
            desired_locations       TEXT NOT NULL DEFAULT '[]',
            willing_to_relocate     INTEGER NOT NULL DEFAULT 0,
            work_arrangements       TEXT NOT NULL DEFAULT '[]',
            employment_types        TEXT NOT NULL DEFAULT '[]',
            experience_level        TEXT,
            years_experience        INTEGER,
            salary_min              INTEGER,
            salary_max              INTEGER,
            salary_currency         TEXT,
            salary_period           TEXT,
            required_skills         TEXT NOT NULL DEFAULT '[]',
            soft_skills             TEXT NOT NULL DEFAULT '[]',
            industries              TEXT NOT NULL DEFAULT '[]',
            confirmed               INTEGER NOT NULL DEFAULT 0,
            embedding_vector        BLOB,
            embedding_source_text   TEXT,
            embedding_version       TEXT,
            embedding_generated_at  TEXT
        );",
    )
}

fn create_raw_postings_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS raw_postings (
            id          TEXT PRIMARY KEY NOT NULL,
            source      TEXT NOT NULL,
            source_id   TEXT NOT NULL,
            payload     TEXT NOT NULL,
            url         TEXT NOT NULL,
            scraped_at  TEXT NOT NULL,
            processed   INTEGER NOT NULL DEFAULT 0,
            error       TEXT,
            UNIQUE(source, source_id)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_raw_source_sourceid
            ON raw_postings (source, source_id);
        CREATE INDEX IF NOT EXISTS idx_raw_unprocessed
            ON raw_postings (processed, scraped_at);",
    )
}

fn create_canonical_postings_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS canonical_postings (
            id                      TEXT PRIMARY KEY NOT NULL,
            raw_id                  TEXT NOT NULL REFERENCES raw_postings(id),
            title                   TEXT NOT NULL,
            company                 TEXT NOT NULL,
            display_location        TEXT NOT NULL,
            posting_url             TEXT NOT NULL,
            description             TEXT NOT NULL,
            employment_type         TEXT,
            salary_min              INTEGER,
            salary_max              INTEGER,
            salary_currency         TEXT,
            salary_period           TEXT,
            posted_date             TEXT NOT NULL,
            source                  TEXT NOT NULL,
            alternate_titles        TEXT NOT NULL DEFAULT '[]',
            required_skills         TEXT NOT NULL DEFAULT '[]',
            preferred_skills        TEXT NOT NULL DEFAULT '[]',
            industries              TEXT NOT NULL DEFAULT '[]',
            job_function            TEXT,
            levels                  TEXT NOT NULL DEFAULT '[]',
            city                    TEXT,
            state                   TEXT,
            country                 TEXT,
            work_arrangement        TEXT,
            remote_allowed          INTEGER NOT NULL DEFAULT 0,
            inferred_salary_min     INTEGER,
            inferred_salary_max     INTEGER,
            inferred_salary_currency TEXT,
            years_experience_min    INTEGER,
            years_experience_max    INTEGER,
            summary                 TEXT,
            embedding_vector        BLOB,
            embedding_source_text   TEXT,
            embedding_version       TEXT,
            embedding_generated_at  TEXT,
            scraped_at              TEXT NOT NULL,
            ai_enhanced             INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_canonical_posted_date
            ON canonical_postings (posted_date DESC);
        CREATE INDEX IF NOT EXISTS idx_canonical_dedup_key
            ON canonical_postings (title, company, display_location);
        CREATE INDEX IF NOT EXISTS idx_canonical_has_embedding
            ON canonical_postings (ai_enhanced, posted_date);",
    )
}

fn create_delivery_history_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS delivery_history (
            user_id                 TEXT NOT NULL REFERENCES users(id),
            canonical_posting_id    TEXT NOT NULL REFERENCES canonical_postings(id),
            score                   REAL NOT NULL,
            stage                   TEXT NOT NULL,
            sent                    INTEGER NOT NULL DEFAULT 0,
            error                   TEXT,
            shown_at                TEXT NOT NULL,
            PRIMARY KEY (user_id, canonical_posting_id)
        );
        CREATE INDEX IF NOT EXISTS idx_delivery_user_day
            ON delivery_history (user_id, shown_at);",
    )
}

fn create_conversation_windows_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_windows (
            id                  TEXT PRIMARY KEY NOT NULL,
            user_id             TEXT NOT NULL REFERENCES users(id),
            started_at          TEXT NOT NULL,
            last_activity_at    TEXT NOT NULL,
            status              TEXT NOT NULL DEFAULT 'active',
            stage_s1_sent       INTEGER NOT NULL DEFAULT 0,
            stage_s2_sent       INTEGER NOT NULL DEFAULT 0,
            stage_s3_sent       INTEGER NOT NULL DEFAULT 0,
            stage_s4_sent       INTEGER NOT NULL DEFAULT 0,
            stage_s5_sent       INTEGER NOT NULL DEFAULT 0,
            messages_in_window  INTEGER NOT NULL DEFAULT 0
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_window_one_active_per_user
            ON conversation_windows (user_id) WHERE status = 'active';",
    )
}

fn create_reminder_log_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reminder_log (
            user_id     TEXT NOT NULL REFERENCES users(id),
            window_id   TEXT NOT NULL REFERENCES conversation_windows(id),
            stage       TEXT NOT NULL,
            sent_at     TEXT NOT NULL,
            PRIMARY KEY (window_id, stage)
        );",
    )
}
