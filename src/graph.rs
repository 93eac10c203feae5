//! Word graph: lexical entries and directed translation links.
//!
//! Words are scoped by language; links are directed edges carrying a note,
//! an explicit ordering integer and a workflow status. The graph is not
//! symmetric: creating A→B says nothing about B→A, and nothing here tries
//! to "fix" that.
//!
//! Deletion is logical. A soft-deleted word keeps its row and its links;
//! the links simply point at a hidden endpoint, and coverage queries stop
//! counting them.

use crate::catalog::{require_group, require_language, GroupKind};
use crate::error::CoreError;
use crate::store::{now_rfc3339, Database};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Workflow status shared by words and translation links.
///
/// Unknown values are rejected at the boundary (`parse`); free-form status
/// strings never reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    Pending,
    Approved,
    Rejected,
}

impl WordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WordStatus::Pending => "pending",
            WordStatus::Approved => "approved",
            WordStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(WordStatus::Pending),
            "approved" => Ok(WordStatus::Approved),
            "rejected" => Ok(WordStatus::Rejected),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }

    /// Explicit transition table. There are no terminal states: every
    /// transition between the three statuses is permitted, and setting the
    /// current status again is an allowed no-op.
    pub fn can_transition(self, next: WordStatus) -> bool {
        use WordStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Approved)
                    | (Pending, Rejected)
                    | (Approved, Rejected)
                    | (Approved, Pending)
                    | (Rejected, Approved)
                    | (Rejected, Pending)
            )
    }
}

impl fmt::Display for WordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for WordStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        WordStatus::parse(s).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for WordStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// Editorial difficulty grade of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Difficulty::parse(s).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// A lexical entry. Identity is independent of translations: a word exists
/// with zero incoming or outgoing links.
#[derive(Debug, Clone)]
pub struct Word {
    pub id: i64,
    pub text: String,
    pub language_code: String,
    pub meaning: String,
    pub category_id: Option<i64>,
    pub status: WordStatus,
    pub pronunciation: String,
    pub difficulty: Difficulty,
    pub image_path: Option<String>,
    pub audio_path: Option<String>,
    pub is_deleted: bool,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for creating a word. `status` defaults to pending and
/// `difficulty` to medium, matching the editorial workflow.
#[derive(Debug, Clone)]
pub struct NewWord<'a> {
    pub text: &'a str,
    pub language: &'a str,
    pub meaning: &'a str,
    pub category: Option<&'a str>,
    pub status: WordStatus,
    pub pronunciation: &'a str,
    pub difficulty: Difficulty,
    pub created_by: Option<&'a str>,
}

impl<'a> NewWord<'a> {
    pub fn new(text: &'a str, language: &'a str, meaning: &'a str) -> Self {
        Self {
            text,
            language,
            meaning,
            category: None,
            status: WordStatus::Pending,
            pronunciation: "",
            difficulty: Difficulty::Medium,
            created_by: None,
        }
    }
}

/// A directed translation edge. Target text and language are denormalized
/// for display and for the (order, target language code) sort.
#[derive(Debug, Clone)]
pub struct TranslationLink {
    pub id: i64,
    pub from_word_id: i64,
    pub to_word_id: i64,
    pub note: String,
    pub order: i64,
    pub status: WordStatus,
    pub to_text: String,
    pub to_language_code: String,
}

/// One audit entry for a word.
#[derive(Debug, Clone)]
pub struct WordChange {
    pub id: i64,
    pub word_id: i64,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: String,
}

// ==================== Connection-level helpers ====================

const WORD_COLUMNS: &str = "w.id, w.text, l.code, w.meaning, w.category_id, w.status, \
     w.pronunciation, w.difficulty, w.image_path, w.audio_path, w.is_deleted, \
     w.created_by, w.created_at, w.updated_at";

fn word_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Word> {
    Ok(Word {
        id: row.get(0)?,
        text: row.get(1)?,
        language_code: row.get(2)?,
        meaning: row.get(3)?,
        category_id: row.get(4)?,
        status: row.get(5)?,
        pronunciation: row.get(6)?,
        difficulty: row.get(7)?,
        image_path: row.get(8)?,
        audio_path: row.get(9)?,
        is_deleted: row.get::<_, i64>(10)? != 0,
        created_by: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

pub(crate) fn get_word_row(conn: &Connection, id: i64) -> Result<Word, CoreError> {
    let sql = format!(
        "SELECT {WORD_COLUMNS} FROM words w JOIN languages l ON l.id = w.language_id
         WHERE w.id = ?1"
    );
    conn.query_row(&sql, params![id], word_from_row)
        .optional()?
        .ok_or_else(|| CoreError::not_found("word", id.to_string()))
}

/// Find the active (non-deleted) word for a (text, language) pair.
/// Soft-deleted twins are intentionally invisible here, so reuse lookups
/// can never pick a deleted row.
pub(crate) fn find_active_word(
    conn: &Connection,
    text: &str,
    language_id: i64,
) -> Result<Option<Word>, CoreError> {
    let sql = format!(
        "SELECT {WORD_COLUMNS} FROM words w JOIN languages l ON l.id = w.language_id
         WHERE w.text = ?1 AND w.language_id = ?2 AND w.is_deleted = 0"
    );
    let word = conn
        .query_row(&sql, params![text, language_id], word_from_row)
        .optional()?;
    Ok(word)
}

pub(crate) fn insert_word_row(
    conn: &Connection,
    text: &str,
    language_id: i64,
    meaning: &str,
    category_id: Option<i64>,
    status: WordStatus,
    pronunciation: &str,
    difficulty: Difficulty,
    created_by: Option<&str>,
) -> Result<i64, CoreError> {
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO words (text, language_id, meaning, category_id, status,
                            pronunciation, difficulty, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            text,
            language_id,
            meaning,
            category_id,
            status,
            pronunciation,
            difficulty,
            created_by,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn link_between(
    conn: &Connection,
    from_word_id: i64,
    to_word_id: i64,
) -> Result<Option<(i64, WordStatus)>, CoreError> {
    let link = conn
        .query_row(
            "SELECT id, status FROM translation_links
             WHERE from_word_id = ?1 AND to_word_id = ?2",
            params![from_word_id, to_word_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(link)
}

pub(crate) fn insert_link_row(
    conn: &Connection,
    from_word_id: i64,
    to_word_id: i64,
    note: &str,
    order: i64,
    status: WordStatus,
) -> Result<i64, CoreError> {
    conn.execute(
        "INSERT INTO translation_links (from_word_id, to_word_id, note, ord, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![from_word_id, to_word_id, note, order, status],
    )?;
    Ok(conn.last_insert_rowid())
}

/// True iff an approved outgoing link targets an active word in the
/// language. Links to soft-deleted endpoints stay in the table but no
/// longer count.
pub(crate) fn approved_link_to_language(
    conn: &Connection,
    word_id: i64,
    language_id: i64,
) -> Result<bool, CoreError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS (
             SELECT 1 FROM translation_links tl
             JOIN words tw ON tw.id = tl.to_word_id
             WHERE tl.from_word_id = ?1
               AND tl.status = 'approved'
               AND tw.language_id = ?2
               AND tw.is_deleted = 0
         )",
        params![word_id, language_id],
        |row| row.get(0),
    )?;
    Ok(exists != 0)
}

fn log_change(
    conn: &Connection,
    word_id: i64,
    action: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
) -> Result<(), CoreError> {
    conn.execute(
        "INSERT INTO word_changes (word_id, action, old_value, new_value, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![word_id, action, old_value, new_value, now_rfc3339()],
    )?;
    Ok(())
}

// ==================== Public graph operations ====================

impl Database {
    /// Create a word. Fails with `Conflict` if an active word with the
    /// same (text, language) exists; a soft-deleted twin does not block
    /// creation.
    pub fn add_word(&self, new: &NewWord<'_>) -> Result<i64, CoreError> {
        let conn = self.conn();
        let language = require_language(&conn, new.language)?;
        let category_id = match new.category {
            Some(code) => Some(require_group(&conn, GroupKind::Category, code)?),
            None => None,
        };
        if find_active_word(&conn, new.text, language.id)?.is_some() {
            return Err(CoreError::conflict(
                "word",
                format!("{} ({})", new.text, new.language),
            ));
        }
        let id = insert_word_row(
            &conn,
            new.text,
            language.id,
            new.meaning,
            category_id,
            new.status,
            new.pronunciation,
            new.difficulty,
            new.created_by,
        )?;
        log_change(&conn, id, "created", None, Some(new.text))?;
        Ok(id)
    }

    /// Fetch a word by id, soft-deleted rows included.
    pub fn get_word(&self, id: i64) -> Result<Word, CoreError> {
        let conn = self.conn();
        get_word_row(&conn, id)
    }

    /// Find the active word for (text, language), if any.
    pub fn find_word(&self, text: &str, language_code: &str) -> Result<Option<Word>, CoreError> {
        let conn = self.conn();
        let language = require_language(&conn, language_code)?;
        find_active_word(&conn, text, language.id)
    }

    /// Change a word's workflow status. All transitions among the three
    /// states are permitted; the change is appended to the word's log.
    pub fn set_word_status(&self, id: i64, status: WordStatus) -> Result<(), CoreError> {
        let conn = self.conn();
        let word = get_word_row(&conn, id)?;
        if !word.status.can_transition(status) {
            return Err(CoreError::InvalidStatus(format!(
                "{} -> {}",
                word.status, status
            )));
        }
        conn.execute(
            "UPDATE words SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, now_rfc3339(), id],
        )?;
        log_change(
            &conn,
            id,
            "status_changed",
            Some(word.status.as_str()),
            Some(status.as_str()),
        )?;
        Ok(())
    }

    /// Soft-delete a word. Returns false if it was already deleted. The
    /// row and its links survive; only visibility changes.
    pub fn soft_delete_word(&self, id: i64) -> Result<bool, CoreError> {
        let conn = self.conn();
        let word = get_word_row(&conn, id)?;
        if word.is_deleted {
            return Ok(false);
        }
        conn.execute(
            "UPDATE words SET is_deleted = 1, updated_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        log_change(&conn, id, "deleted", Some(word.text.as_str()), None)?;
        info!(word_id = id, text = %word.text, "soft-deleted word");
        Ok(true)
    }

    /// Restore a soft-deleted word. Fails with `Conflict` if an active
    /// word has since taken the same (text, language) pair.
    pub fn restore_word(&self, id: i64) -> Result<bool, CoreError> {
        let conn = self.conn();
        let word = get_word_row(&conn, id)?;
        if !word.is_deleted {
            return Ok(false);
        }
        let language = require_language(&conn, &word.language_code)?;
        if find_active_word(&conn, &word.text, language.id)?.is_some() {
            return Err(CoreError::conflict(
                "word",
                format!("{} ({})", word.text, word.language_code),
            ));
        }
        conn.execute(
            "UPDATE words SET is_deleted = 0, updated_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        log_change(&conn, id, "restored", None, Some(word.text.as_str()))?;
        Ok(true)
    }

    /// Create a translation link. Fails with `InvalidLink` for self-links
    /// and `Conflict` if the ordered (from, to) pair already exists (the
    /// caller should mutate the existing link instead).
    pub fn add_link(
        &self,
        from_word_id: i64,
        to_word_id: i64,
        note: &str,
        status: WordStatus,
    ) -> Result<i64, CoreError> {
        if from_word_id == to_word_id {
            return Err(CoreError::InvalidLink(format!(
                "word {} cannot translate itself",
                from_word_id
            )));
        }
        let conn = self.conn();
        get_word_row(&conn, from_word_id)?;
        get_word_row(&conn, to_word_id)?;
        if link_between(&conn, from_word_id, to_word_id)?.is_some() {
            return Err(CoreError::conflict(
                "link",
                format!("{} -> {}", from_word_id, to_word_id),
            ));
        }
        insert_link_row(&conn, from_word_id, to_word_id, note, 0, status)
    }

    /// Outgoing links of a word, ordered by (order, target language code).
    pub fn links_from(&self, word_id: i64) -> Result<Vec<TranslationLink>, CoreError> {
        let conn = self.conn();
        get_word_row(&conn, word_id)?;
        let mut stmt = conn.prepare(
            "SELECT tl.id, tl.from_word_id, tl.to_word_id, tl.note, tl.ord, tl.status,
                    tw.text, l.code
             FROM translation_links tl
             JOIN words tw ON tw.id = tl.to_word_id
             JOIN languages l ON l.id = tw.language_id
             WHERE tl.from_word_id = ?1
             ORDER BY tl.ord, l.code",
        )?;
        let links = stmt
            .query_map(params![word_id], |row| {
                Ok(TranslationLink {
                    id: row.get(0)?,
                    from_word_id: row.get(1)?,
                    to_word_id: row.get(2)?,
                    note: row.get(3)?,
                    order: row.get(4)?,
                    status: row.get(5)?,
                    to_text: row.get(6)?,
                    to_language_code: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    /// True iff any approved link from `word_id` targets an active word in
    /// the given language. Directed: says nothing about the reverse edge.
    pub fn has_link_to_language(
        &self,
        word_id: i64,
        language_code: &str,
    ) -> Result<bool, CoreError> {
        let conn = self.conn();
        let language = require_language(&conn, language_code)?;
        approved_link_to_language(&conn, word_id, language.id)
    }

    /// Change a link's workflow status.
    pub fn set_link_status(&self, link_id: i64, status: WordStatus) -> Result<(), CoreError> {
        let conn = self.conn();
        let current: WordStatus = conn
            .query_row(
                "SELECT status FROM translation_links WHERE id = ?1",
                params![link_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("link", link_id.to_string()))?;
        if !current.can_transition(status) {
            return Err(CoreError::InvalidStatus(format!(
                "{} -> {}",
                current, status
            )));
        }
        conn.execute(
            "UPDATE translation_links SET status = ?1 WHERE id = ?2",
            params![status, link_id],
        )?;
        Ok(())
    }

    /// Update a link's note and ordering.
    pub fn update_link(&self, link_id: i64, note: &str, order: i64) -> Result<(), CoreError> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE translation_links SET note = ?1, ord = ?2 WHERE id = ?3",
            params![note, order, link_id],
        )?;
        if updated == 0 {
            return Err(CoreError::not_found("link", link_id.to_string()));
        }
        Ok(())
    }

    /// Attach a tag to a word. Idempotent.
    pub fn tag_word(&self, word_id: i64, tag_code: &str) -> Result<(), CoreError> {
        let conn = self.conn();
        get_word_row(&conn, word_id)?;
        let tag_id = require_group(&conn, GroupKind::Tag, tag_code)?;
        conn.execute(
            "INSERT OR IGNORE INTO word_tags (word_id, tag_id) VALUES (?1, ?2)",
            params![word_id, tag_id],
        )?;
        Ok(())
    }

    /// Tag codes attached to a word, ordered.
    pub fn word_tags(&self, word_id: i64) -> Result<Vec<String>, CoreError> {
        let conn = self.conn();
        get_word_row(&conn, word_id)?;
        let mut stmt = conn.prepare(
            "SELECT t.code FROM word_tags wt JOIN tags t ON t.id = wt.tag_id
             WHERE wt.word_id = ?1 ORDER BY t.code",
        )?;
        let codes = stmt
            .query_map(params![word_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(codes)
    }

    /// Substring search over approved, non-deleted words. Matches in the
    /// detected language rank first, then everything else alphabetically;
    /// pass `None` for a language-agnostic match.
    pub fn search_words(
        &self,
        query: &str,
        detected_language: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Word>, CoreError> {
        let conn = self.conn();
        let pattern = format!("%{}%", query);
        let detected = detected_language.unwrap_or("");
        let sql = format!(
            "SELECT {WORD_COLUMNS} FROM words w JOIN languages l ON l.id = w.language_id
             WHERE w.status = 'approved' AND w.is_deleted = 0
               AND (w.text LIKE ?1 OR w.meaning LIKE ?1)
             ORDER BY (CASE WHEN l.code = ?2 THEN 0 ELSE 1 END), w.text
             LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let words = stmt
            .query_map(params![pattern, detected, limit as i64], word_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(words)
    }

    /// Audit log entries for a word, oldest first.
    pub fn changes_for(&self, word_id: i64) -> Result<Vec<WordChange>, CoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, word_id, action, old_value, new_value, changed_at
             FROM word_changes WHERE word_id = ?1 ORDER BY id",
        )?;
        let changes = stmt
            .query_map(params![word_id], |row| {
                Ok(WordChange {
                    id: row.get(0)?,
                    word_id: row.get(1)?,
                    action: row.get(2)?,
                    old_value: row.get(3)?,
                    new_value: row.get(4)?,
                    changed_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(changes)
    }
}
