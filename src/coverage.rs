//! Completeness engine: per-entity and aggregate translation coverage.
//!
//! Coverage is the fraction of known languages for which an entity has an
//! acceptable translation. "Acceptable" differs by entity kind: a group
//! (category or tag) needs a label row, a word needs an approved outgoing
//! link to an active word in that language.
//!
//! Nothing here is cached. Every figure is recomputed from current store
//! state on demand; a stale dashboard would silently mislead editors.

use crate::catalog::{require_group, require_language, GroupKind, Language};
use crate::error::CoreError;
use crate::graph::get_word_row;
use crate::store::Database;
use rusqlite::params;
use serde::Serialize;
use std::collections::HashSet;

/// Uniform coverage capability, implemented per concrete entity kind
/// instead of discovered at runtime.
pub trait TranslationCoverage {
    /// Language codes with an acceptable translation, in canonical order.
    fn covered_languages(&self, db: &Database) -> Result<Vec<String>, CoreError>;

    /// Languages with no acceptable translation, in canonical order.
    fn missing_languages(&self, db: &Database) -> Result<Vec<Language>, CoreError> {
        let covered: HashSet<String> = self.covered_languages(db)?.into_iter().collect();
        let missing = db
            .list_languages()?
            .into_iter()
            .filter(|language| !covered.contains(&language.code))
            .collect();
        Ok(missing)
    }

    /// Covered languages over all known languages. Zero known languages
    /// reports 0.0 by convention, never a division fault.
    fn coverage(&self, db: &Database) -> Result<f64, CoreError> {
        let total = db.list_languages()?.len();
        if total == 0 {
            return Ok(0.0);
        }
        let covered = self.covered_languages(db)?.len();
        Ok(covered as f64 / total as f64)
    }
}

/// Coverage view of a category or tag.
#[derive(Debug, Clone, Copy)]
pub struct GroupRef<'a> {
    pub kind: GroupKind,
    pub code: &'a str,
}

impl TranslationCoverage for GroupRef<'_> {
    fn covered_languages(&self, db: &Database) -> Result<Vec<String>, CoreError> {
        let conn = db.conn();
        let group = require_group(&conn, self.kind, self.code)?;
        let sql = format!(
            "SELECT l.code FROM {table} t JOIN languages l ON l.id = t.language_id
             WHERE t.{fk} = ?1 ORDER BY l.code",
            table = self.kind.label_table(),
            fk = self.kind.fk_column(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let codes = stmt
            .query_map(params![group], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(codes)
    }
}

/// Coverage view of a word.
#[derive(Debug, Clone, Copy)]
pub struct WordRef {
    pub id: i64,
}

impl TranslationCoverage for WordRef {
    fn covered_languages(&self, db: &Database) -> Result<Vec<String>, CoreError> {
        let conn = db.conn();
        get_word_row(&conn, self.id)?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT l.code
             FROM translation_links tl
             JOIN words tw ON tw.id = tl.to_word_id
             JOIN languages l ON l.id = tw.language_id
             WHERE tl.from_word_id = ?1
               AND tl.status = 'approved'
               AND tw.is_deleted = 0
             ORDER BY l.code",
        )?;
        let codes = stmt
            .query_map(params![self.id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(codes)
    }
}

/// Covered/total pair for one section of a report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectionCoverage {
    pub covered: usize,
    pub total: usize,
    pub fraction: f64,
}

impl SectionCoverage {
    fn new(covered: usize, total: usize) -> Self {
        let fraction = if total == 0 {
            0.0
        } else {
            covered as f64 / total as f64
        };
        Self {
            covered,
            total,
            fraction,
        }
    }
}

/// How much of the catalog is translated into one language.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub language: String,
    /// Categories with a label in this language.
    pub categories: SectionCoverage,
    /// Tags with a label in this language.
    pub tags: SectionCoverage,
    /// Active words in other languages with an approved link into this one.
    pub words: SectionCoverage,
}

/// Aggregate coverage of one target language across the full entity
/// population. Recomputed from scratch on every call.
pub fn language_progress(db: &Database, language_code: &str) -> Result<CoverageReport, CoreError> {
    let conn = db.conn();
    let language = require_language(&conn, language_code)?;

    let count = |sql: &str| -> Result<usize, CoreError> {
        let n: i64 = conn.query_row(sql, params![language.id], |row| row.get(0))?;
        Ok(n as usize)
    };
    let count_plain = |sql: &str| -> Result<usize, CoreError> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    };

    let categories_total = count_plain("SELECT COUNT(*) FROM categories")?;
    let categories_covered = count(
        "SELECT COUNT(*) FROM categories c WHERE EXISTS (
             SELECT 1 FROM category_labels t
             WHERE t.category_id = c.id AND t.language_id = ?1)",
    )?;

    let tags_total = count_plain("SELECT COUNT(*) FROM tags")?;
    let tags_covered = count(
        "SELECT COUNT(*) FROM tags g WHERE EXISTS (
             SELECT 1 FROM tag_labels t
             WHERE t.tag_id = g.id AND t.language_id = ?1)",
    )?;

    let words_total = count(
        "SELECT COUNT(*) FROM words w
         WHERE w.is_deleted = 0 AND w.language_id != ?1",
    )?;
    let words_covered = count(
        "SELECT COUNT(*) FROM words w
         WHERE w.is_deleted = 0 AND w.language_id != ?1
           AND EXISTS (
               SELECT 1 FROM translation_links tl
               JOIN words tw ON tw.id = tl.to_word_id
               WHERE tl.from_word_id = w.id
                 AND tl.status = 'approved'
                 AND tw.language_id = ?1
                 AND tw.is_deleted = 0)",
    )?;

    Ok(CoverageReport {
        language: language.code,
        categories: SectionCoverage::new(categories_covered, categories_total),
        tags: SectionCoverage::new(tags_covered, tags_total),
        words: SectionCoverage::new(words_covered, words_total),
    })
}

/// One `CoverageReport` per registered language, in canonical order.
pub fn overall_report(db: &Database) -> Result<Vec<CoverageReport>, CoreError> {
    let languages = db.list_languages()?;
    languages
        .into_iter()
        .map(|language| language_progress(db, &language.code))
        .collect()
}
