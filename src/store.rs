//! Database handle and schema.
//!
//! All persisted state lives in a single SQLite database. The `Database`
//! handle is cheap to clone and safe to share between threads; every public
//! operation takes the connection lock once, so multi-statement work
//! (upserts, per-entity transactions) is serialized in-process and the
//! uniqueness invariants below resolve concurrent create-if-absent races to
//! exactly one surviving row.
//!
//! Uniqueness invariants expressed in the schema:
//! - one language per code
//! - one label per (group, language) pair, for categories and tags
//! - one active word per (text, language) pair — soft-deleted rows are
//!   excluded from the index and do not block re-creation
//! - one translation link per ordered (from, to) pair
//! - one interface string per (language, key) pair

use crate::error::CoreError;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS languages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS category_labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL REFERENCES categories(id),
        language_id INTEGER NOT NULL REFERENCES languages(id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        UNIQUE(category_id, language_id)
    );

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS tag_labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tag_id INTEGER NOT NULL REFERENCES tags(id),
        language_id INTEGER NOT NULL REFERENCES languages(id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        UNIQUE(tag_id, language_id)
    );

    CREATE TABLE IF NOT EXISTS words (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        language_id INTEGER NOT NULL REFERENCES languages(id),
        meaning TEXT NOT NULL DEFAULT '',
        category_id INTEGER REFERENCES categories(id),
        status TEXT NOT NULL DEFAULT 'pending',
        pronunciation TEXT NOT NULL DEFAULT '',
        difficulty TEXT NOT NULL DEFAULT 'medium',
        image_path TEXT,
        audio_path TEXT,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_by TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_words_text_lang_active
        ON words(text, language_id) WHERE is_deleted = 0;
    CREATE INDEX IF NOT EXISTS idx_words_language ON words(language_id);
    CREATE INDEX IF NOT EXISTS idx_words_status ON words(status);

    CREATE TABLE IF NOT EXISTS word_tags (
        word_id INTEGER NOT NULL REFERENCES words(id),
        tag_id INTEGER NOT NULL REFERENCES tags(id),
        UNIQUE(word_id, tag_id)
    );

    CREATE TABLE IF NOT EXISTS translation_links (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_word_id INTEGER NOT NULL REFERENCES words(id),
        to_word_id INTEGER NOT NULL REFERENCES words(id),
        note TEXT NOT NULL DEFAULT '',
        ord INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending',
        UNIQUE(from_word_id, to_word_id)
    );

    CREATE INDEX IF NOT EXISTS idx_links_from ON translation_links(from_word_id);

    CREATE TABLE IF NOT EXISTS interface_strings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        language_id INTEGER NOT NULL REFERENCES languages(id),
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        UNIQUE(language_id, key)
    );

    CREATE TABLE IF NOT EXISTS word_changes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        word_id INTEGER NOT NULL REFERENCES words(id),
        action TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT,
        changed_at TEXT NOT NULL
    );
";

/// Shared handle to the dictionary database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn new(path: &str) -> Result<Self, CoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database. Only reachable from tests; production
    /// callers always persist to disk.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Run `f` inside a single transaction. Commits on success, rolls back
    /// on any error. The connection lock is held for the whole unit, so the
    /// transaction is also the atomic unit seen by other in-process callers.
    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let conn = self.conn();
        conn.execute("BEGIN IMMEDIATE", [])?;
        match f(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }
}

/// Current timestamp in the RFC 3339 form used by all audit columns.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
