//! Catalog store: languages, group labels, interface strings.
//!
//! Languages are immutable reference data. Categories and tags are
//! "translatable groups": a language-independent code plus at most one
//! label per (group, language) pair. Interface strings are flat
//! (language, key) → value pairs with namespace-path keys like
//! `menu.home`.
//!
//! Lookups of unknown groups or languages are reported as errors, never
//! silently defaulted; the caller decides what a missing label falls back
//! to.

use crate::error::CoreError;
use crate::store::Database;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::OnceLock;

/// A registered language (reference data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Language {
    pub id: i64,
    /// Short unique code, e.g. "en", "kk".
    pub code: String,
    /// Display name, e.g. "English", "Қазақша".
    pub name: String,
}

/// The two kinds of translatable group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupKind {
    Category,
    Tag,
}

impl GroupKind {
    pub(crate) fn group_table(self) -> &'static str {
        match self {
            GroupKind::Category => "categories",
            GroupKind::Tag => "tags",
        }
    }

    pub(crate) fn label_table(self) -> &'static str {
        match self {
            GroupKind::Category => "category_labels",
            GroupKind::Tag => "tag_labels",
        }
    }

    pub(crate) fn fk_column(self) -> &'static str {
        match self {
            GroupKind::Category => "category_id",
            GroupKind::Tag => "tag_id",
        }
    }

    pub(crate) fn entity(self) -> &'static str {
        match self {
            GroupKind::Category => "category",
            GroupKind::Tag => "tag",
        }
    }
}

/// One per-language label of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub language_code: String,
    pub name: String,
    pub description: String,
}

static KEY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Validate an interface-string key: dot-separated lowercase segments,
/// e.g. `menu.home` or `button.save`.
fn validate_key(key: &str) -> Result<(), CoreError> {
    let regex = KEY_REGEX
        .get_or_init(|| Regex::new(r"^[a-z0-9_]+(\.[a-z0-9_]+)*$").unwrap());
    if regex.is_match(key) {
        Ok(())
    } else {
        Err(CoreError::InvalidKey(key.to_string()))
    }
}

// ==================== Connection-level helpers ====================
// Shared with the resolution engine, which runs several of these inside
// one per-entity transaction.

pub(crate) fn language_by_code(
    conn: &Connection,
    code: &str,
) -> Result<Option<Language>, CoreError> {
    let language = conn
        .query_row(
            "SELECT id, code, name FROM languages WHERE code = ?1",
            params![code],
            |row| {
                Ok(Language {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(language)
}

/// Like `language_by_code` but an absent row is an `UnknownLanguage` error.
pub(crate) fn require_language(conn: &Connection, code: &str) -> Result<Language, CoreError> {
    language_by_code(conn, code)?.ok_or_else(|| CoreError::UnknownLanguage(code.to_string()))
}

pub(crate) fn list_languages_ordered(conn: &Connection) -> Result<Vec<Language>, CoreError> {
    let mut stmt = conn.prepare("SELECT id, code, name FROM languages ORDER BY code")?;
    let languages = stmt
        .query_map([], |row| {
            Ok(Language {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(languages)
}

pub(crate) fn group_id(
    conn: &Connection,
    kind: GroupKind,
    code: &str,
) -> Result<Option<i64>, CoreError> {
    let sql = format!("SELECT id FROM {} WHERE code = ?1", kind.group_table());
    let id = conn
        .query_row(&sql, params![code], |row| row.get(0))
        .optional()?;
    Ok(id)
}

pub(crate) fn require_group(
    conn: &Connection,
    kind: GroupKind,
    code: &str,
) -> Result<i64, CoreError> {
    group_id(conn, kind, code)?.ok_or_else(|| CoreError::not_found(kind.entity(), code))
}

/// Languages with no label for the group, in canonical (code) order.
pub(crate) fn missing_label_languages(
    conn: &Connection,
    kind: GroupKind,
    group_id: i64,
) -> Result<Vec<Language>, CoreError> {
    let sql = format!(
        "SELECT l.id, l.code, l.name FROM languages l
         WHERE NOT EXISTS (
             SELECT 1 FROM {table} t
             WHERE t.{fk} = ?1 AND t.language_id = l.id
         )
         ORDER BY l.code",
        table = kind.label_table(),
        fk = kind.fk_column(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let languages = stmt
        .query_map(params![group_id], |row| {
            Ok(Language {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(languages)
}

/// Create-or-overwrite a label in a single atomic statement. Concurrent
/// create-if-absent attempts land on the same row: first writer wins the
/// identity, last writer wins the value fields.
pub(crate) fn upsert_label_row(
    conn: &Connection,
    kind: GroupKind,
    group_id: i64,
    language_id: i64,
    name: &str,
    description: &str,
) -> Result<(), CoreError> {
    let sql = format!(
        "INSERT INTO {table} ({fk}, language_id, name, description)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT({fk}, language_id)
         DO UPDATE SET name = excluded.name, description = excluded.description",
        table = kind.label_table(),
        fk = kind.fk_column(),
    );
    conn.execute(&sql, params![group_id, language_id, name, description])?;
    Ok(())
}

// ==================== Public catalog operations ====================

impl Database {
    /// Register a language. Fails with `Conflict` if the code is taken.
    pub fn add_language(&self, code: &str, name: &str) -> Result<i64, CoreError> {
        let conn = self.conn();
        if language_by_code(&conn, code)?.is_some() {
            return Err(CoreError::conflict("language", code));
        }
        conn.execute(
            "INSERT INTO languages (code, name) VALUES (?1, ?2)",
            params![code, name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_language(&self, code: &str) -> Result<Language, CoreError> {
        let conn = self.conn();
        language_by_code(&conn, code)?.ok_or_else(|| CoreError::not_found("language", code))
    }

    /// All registered languages in the canonical ordering (code ascending).
    pub fn list_languages(&self) -> Result<Vec<Language>, CoreError> {
        let conn = self.conn();
        list_languages_ordered(&conn)
    }

    /// Register a category or tag. Fails with `Conflict` if the code is taken.
    pub fn add_group(&self, kind: GroupKind, code: &str) -> Result<i64, CoreError> {
        let conn = self.conn();
        if group_id(&conn, kind, code)?.is_some() {
            return Err(CoreError::conflict(kind.entity(), code));
        }
        let sql = format!("INSERT INTO {} (code) VALUES (?1)", kind.group_table());
        conn.execute(&sql, params![code])?;
        Ok(conn.last_insert_rowid())
    }

    /// All group codes of a kind, ordered by code.
    pub fn list_groups(&self, kind: GroupKind) -> Result<Vec<String>, CoreError> {
        let conn = self.conn();
        let sql = format!("SELECT code FROM {} ORDER BY code", kind.group_table());
        let mut stmt = conn.prepare(&sql)?;
        let codes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(codes)
    }

    /// The label of a group in one language, or `None` if not yet
    /// translated. Unknown group/language codes are errors.
    pub fn get_label(
        &self,
        kind: GroupKind,
        group_code: &str,
        language_code: &str,
    ) -> Result<Option<Label>, CoreError> {
        let conn = self.conn();
        let group = require_group(&conn, kind, group_code)?;
        let language = require_language(&conn, language_code)?;
        let sql = format!(
            "SELECT name, description FROM {table} WHERE {fk} = ?1 AND language_id = ?2",
            table = kind.label_table(),
            fk = kind.fk_column(),
        );
        let label = conn
            .query_row(&sql, params![group, language.id], |row| {
                Ok(Label {
                    language_code: language.code.clone(),
                    name: row.get(0)?,
                    description: row.get(1)?,
                })
            })
            .optional()?;
        Ok(label)
    }

    /// Languages that have no label for this group, in canonical order.
    pub fn list_missing_languages(
        &self,
        kind: GroupKind,
        group_code: &str,
    ) -> Result<Vec<Language>, CoreError> {
        let conn = self.conn();
        let group = require_group(&conn, kind, group_code)?;
        missing_label_languages(&conn, kind, group)
    }

    /// Idempotent create-or-overwrite of a group label, atomic per
    /// (group, language) pair.
    pub fn upsert_label(
        &self,
        kind: GroupKind,
        group_code: &str,
        language_code: &str,
        name: &str,
        description: &str,
    ) -> Result<(), CoreError> {
        let conn = self.conn();
        let group = require_group(&conn, kind, group_code)?;
        let language = require_language(&conn, language_code)?;
        upsert_label_row(&conn, kind, group, language.id, name, description)
    }

    /// All labels of a group, ordered by language code.
    pub fn list_labels(
        &self,
        kind: GroupKind,
        group_code: &str,
    ) -> Result<Vec<Label>, CoreError> {
        let conn = self.conn();
        let group = require_group(&conn, kind, group_code)?;
        let sql = format!(
            "SELECT l.code, t.name, t.description
             FROM {table} t JOIN languages l ON l.id = t.language_id
             WHERE t.{fk} = ?1 ORDER BY l.code",
            table = kind.label_table(),
            fk = kind.fk_column(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let labels = stmt
            .query_map(params![group], |row| {
                Ok(Label {
                    language_code: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    /// Upsert one interface string, atomic per (language, key) pair.
    pub fn set_interface_string(
        &self,
        language_code: &str,
        key: &str,
        value: &str,
    ) -> Result<(), CoreError> {
        validate_key(key)?;
        let conn = self.conn();
        let language = require_language(&conn, language_code)?;
        conn.execute(
            "INSERT INTO interface_strings (language_id, key, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(language_id, key) DO UPDATE SET value = excluded.value",
            params![language.id, key, value],
        )?;
        Ok(())
    }

    pub fn get_interface_string(
        &self,
        language_code: &str,
        key: &str,
    ) -> Result<Option<String>, CoreError> {
        let conn = self.conn();
        let language = require_language(&conn, language_code)?;
        let value = conn
            .query_row(
                "SELECT value FROM interface_strings WHERE language_id = ?1 AND key = ?2",
                params![language.id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Keys present in `reference_code` but absent in `language_code`,
    /// ordered. Gives editors a worklist for untranslated UI strings.
    pub fn missing_interface_keys(
        &self,
        language_code: &str,
        reference_code: &str,
    ) -> Result<Vec<String>, CoreError> {
        let conn = self.conn();
        let language = require_language(&conn, language_code)?;
        let reference = require_language(&conn, reference_code)?;
        let mut stmt = conn.prepare(
            "SELECT r.key FROM interface_strings r
             WHERE r.language_id = ?1
               AND NOT EXISTS (
                   SELECT 1 FROM interface_strings t
                   WHERE t.language_id = ?2 AND t.key = r.key
               )
             ORDER BY r.key",
        )?;
        let keys = stmt
            .query_map(params![reference.id, language.id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}
