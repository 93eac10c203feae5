//! Resolution engine: closes coverage gaps found by the completeness
//! engine.
//!
//! Three policies, all idempotent:
//! 1. placeholder fill for group labels (deterministic marker text),
//! 2. copy-based fill for words when the caller supplies translated text,
//! 3. a similarity fallback that only *suggests* — it never persists and
//!    never approves anything on its own.
//!
//! Batch entry points process each entity in its own atomic unit; a
//! failure on one entity never rolls back or aborts its siblings.

use crate::catalog::{
    missing_label_languages, require_group, require_language, upsert_label_row, GroupKind,
};
use crate::error::CoreError;
use crate::graph::{
    approved_link_to_language, find_active_word, get_word_row, insert_link_row, insert_word_row,
    link_between, Difficulty, WordStatus,
};
use crate::store::Database;
use rusqlite::params;
use tracing::{info, warn};

/// Deterministic stand-in text for a missing translation. Distinguishable
/// from human-entered content so review queues can find it.
pub fn placeholder_marker(language_code: &str, code: &str) -> String {
    format!("[auto:{}] {}", language_code, code)
}

/// Pluggable source of best-effort translation suggestions.
///
/// The built-in prefix matcher is deliberately weak; the trait exists so a
/// stronger matcher can replace it without touching the engine's control
/// flow. Implementations must not mutate the store.
pub trait SuggestionStrategy {
    /// A candidate translation of `source_text` in the target language,
    /// or `None` when nothing plausible exists.
    fn suggest(
        &self,
        db: &Database,
        source_text: &str,
        target_language: &str,
    ) -> Result<Option<String>, CoreError>;
}

/// Default strategy: match a short prefix of the source text against
/// existing active target-language words.
#[derive(Debug, Clone, Copy)]
pub struct PrefixMatch {
    pub prefix_len: usize,
}

impl Default for PrefixMatch {
    fn default() -> Self {
        Self { prefix_len: 3 }
    }
}

impl SuggestionStrategy for PrefixMatch {
    fn suggest(
        &self,
        db: &Database,
        source_text: &str,
        target_language: &str,
    ) -> Result<Option<String>, CoreError> {
        let prefix: String = source_text.chars().take(self.prefix_len).collect();
        if prefix.is_empty() {
            return Ok(None);
        }
        let conn = db.conn();
        let language = require_language(&conn, target_language)?;
        let pattern = format!("{}%", prefix);
        let suggestion = conn
            .query_row(
                "SELECT text FROM words
                 WHERE language_id = ?1 AND is_deleted = 0 AND text LIKE ?2
                 ORDER BY text LIMIT 1",
                params![language.id, pattern],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(CoreError::from(other)),
            })?;
        Ok(suggestion)
    }
}

/// One placeholder label written by `fill_placeholder_labels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderFill {
    pub language_code: String,
    pub name: String,
}

/// Create placeholder labels for every language a group is missing.
/// Idempotent: already-labeled languages are untouched, and a re-run
/// finds no gaps and writes nothing.
pub fn fill_placeholder_labels(
    db: &Database,
    kind: GroupKind,
    group_code: &str,
) -> Result<Vec<PlaceholderFill>, CoreError> {
    db.with_tx(|conn| {
        let group = require_group(conn, kind, group_code)?;
        let missing = missing_label_languages(conn, kind, group)?;
        let mut filled = Vec::with_capacity(missing.len());
        for language in missing {
            let name = placeholder_marker(&language.code, group_code);
            upsert_label_row(conn, kind, group, language.id, &name, "")?;
            filled.push(PlaceholderFill {
                language_code: language.code,
                name,
            });
        }
        if !filled.is_empty() {
            info!(
                group = group_code,
                count = filled.len(),
                "filled placeholder labels"
            );
        }
        Ok(filled)
    })
}

/// Outcome of resolving one word/language gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// A new target word was created and linked.
    Created { word_id: i64, link_id: i64 },
    /// An existing target word (or existing link) satisfied the request.
    Reused { word_id: i64, link_id: i64 },
    /// The word already had an approved translation in the language.
    Skipped,
    /// Similarity fallback: a non-authoritative suggestion for a human to
    /// review. Nothing was persisted.
    Suggested { text: String },
}

/// One gap to resolve: translate `word_id` into `target_language`.
///
/// With `text` supplied this is a copy-based fill; without it the engine
/// falls back to the suggestion strategy. `status` applies to the created
/// word and link and must be approved or pending — the engine refuses to
/// create rejected content.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub word_id: i64,
    pub target_language: String,
    pub text: Option<String>,
    pub meaning: Option<String>,
    pub status: WordStatus,
}

impl ResolveRequest {
    pub fn new(word_id: i64, target_language: &str) -> Self {
        Self {
            word_id,
            target_language: target_language.to_string(),
            text: None,
            meaning: None,
            status: WordStatus::Pending,
        }
    }
}

/// Resolve a single word/language gap. The mutating path runs in its own
/// transaction; the suggestion path reads only.
pub fn resolve_word(
    db: &Database,
    strategy: &dyn SuggestionStrategy,
    request: &ResolveRequest,
) -> Result<ResolveOutcome, CoreError> {
    if request.status == WordStatus::Rejected {
        return Err(CoreError::InvalidStatus(
            "cannot create a rejected translation".to_string(),
        ));
    }

    if request.text.is_some() {
        return copy_fill(db, request);
    }

    // Suggestion path: validate, then consult the strategy without holding
    // the connection lock.
    let source = {
        let conn = db.conn();
        let language = require_language(&conn, &request.target_language)?;
        let source = get_word_row(&conn, request.word_id)?;
        if approved_link_to_language(&conn, source.id, language.id)? {
            return Ok(ResolveOutcome::Skipped);
        }
        source
    };

    let text = match strategy.suggest(db, &source.text, &request.target_language)? {
        Some(text) => text,
        None => placeholder_marker(&request.target_language, &source.text),
    };
    Ok(ResolveOutcome::Suggested { text })
}

fn copy_fill(db: &Database, request: &ResolveRequest) -> Result<ResolveOutcome, CoreError> {
    let text = request.text.as_deref().unwrap_or_default();
    db.with_tx(|conn| {
        let language = require_language(conn, &request.target_language)?;
        let source = get_word_row(conn, request.word_id)?;
        if approved_link_to_language(conn, source.id, language.id)? {
            return Ok(ResolveOutcome::Skipped);
        }

        // Reuse an identical active word if one exists; soft-deleted twins
        // are never resurrected.
        let (target_id, created_word) = match find_active_word(conn, text, language.id)? {
            Some(existing) => (existing.id, false),
            None => {
                // Meaning is copied from the source as a starting point
                // only when the caller did not supply one.
                let meaning = request.meaning.as_deref().unwrap_or(&source.meaning);
                let id = insert_word_row(
                    conn,
                    text,
                    language.id,
                    meaning,
                    source.category_id,
                    request.status,
                    "",
                    Difficulty::Medium,
                    source.created_by.as_deref(),
                )?;
                (id, true)
            }
        };

        let outcome = match link_between(conn, source.id, target_id)? {
            Some((link_id, _)) => ResolveOutcome::Reused {
                word_id: target_id,
                link_id,
            },
            None => {
                let link_id =
                    insert_link_row(conn, source.id, target_id, "", 0, request.status)?;
                if created_word {
                    ResolveOutcome::Created {
                        word_id: target_id,
                        link_id,
                    }
                } else {
                    ResolveOutcome::Reused {
                        word_id: target_id,
                        link_id,
                    }
                }
            }
        };
        info!(
            from = source.id,
            to = target_id,
            language = %request.target_language,
            created_word,
            "copy-filled translation"
        );
        Ok(outcome)
    })
}

/// Per-entity result inside a batch report.
#[derive(Debug)]
pub struct EntityOutcome {
    pub word_id: i64,
    pub target_language: String,
    pub result: Result<ResolveOutcome, CoreError>,
}

/// Aggregate result of a bulk resolution. Successes achieved before a
/// failing entity are always reported; there is no all-or-nothing mode.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<EntityOutcome>,
    pub created: usize,
    pub reused: usize,
    pub skipped: usize,
    pub suggested: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: EntityOutcome) {
        match &outcome.result {
            Ok(ResolveOutcome::Created { .. }) => self.created += 1,
            Ok(ResolveOutcome::Reused { .. }) => self.reused += 1,
            Ok(ResolveOutcome::Skipped) => self.skipped += 1,
            Ok(ResolveOutcome::Suggested { .. }) => self.suggested += 1,
            Err(_) => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Resolve a batch of gaps, one atomic unit per entity. Errors are
/// collected per entity, never aggregated into a single failure.
pub fn resolve_batch(
    db: &Database,
    strategy: &dyn SuggestionStrategy,
    requests: &[ResolveRequest],
) -> BatchReport {
    let mut report = BatchReport::default();
    for request in requests {
        let result = resolve_word(db, strategy, request);
        if let Err(e) = &result {
            warn!(
                word_id = request.word_id,
                language = %request.target_language,
                error = %e,
                "resolution failed for entity"
            );
        }
        report.record(EntityOutcome {
            word_id: request.word_id,
            target_language: request.target_language.clone(),
            result,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NewWord;

    fn test_db() -> Database {
        let db = Database::open_in_memory().expect("open");
        for (code, name) in [
            ("ru", "Русский"),
            ("kk", "Қазақша"),
            ("en", "English"),
            ("tr", "Türkçe"),
        ] {
            db.add_language(code, name).expect("add language");
        }
        db
    }

    fn add_approved(db: &Database, text: &str, language: &str, meaning: &str) -> i64 {
        let mut new = NewWord::new(text, language, meaning);
        new.status = WordStatus::Approved;
        db.add_word(&new).expect("add word")
    }

    // ==================== Placeholder Fill Tests ====================

    #[test]
    fn test_placeholder_fill_creates_missing_labels() {
        let db = test_db();
        db.add_group(GroupKind::Category, "animals").expect("add");
        db.upsert_label(GroupKind::Category, "animals", "en", "Animals", "")
            .expect("en");

        let filled = fill_placeholder_labels(&db, GroupKind::Category, "animals").expect("fill");
        let languages: Vec<&str> = filled.iter().map(|f| f.language_code.as_str()).collect();
        assert_eq!(languages, vec!["kk", "ru", "tr"]);
        assert_eq!(filled[0].name, "[auto:kk] animals");

        // Real content untouched
        let label = db
            .get_label(GroupKind::Category, "animals", "en")
            .expect("get")
            .expect("present");
        assert_eq!(label.name, "Animals");
    }

    #[test]
    fn test_placeholder_fill_is_idempotent() {
        let db = test_db();
        db.add_group(GroupKind::Tag, "noun").expect("add");

        let first = fill_placeholder_labels(&db, GroupKind::Tag, "noun").expect("first");
        assert_eq!(first.len(), 4);

        let second = fill_placeholder_labels(&db, GroupKind::Tag, "noun").expect("second");
        assert!(second.is_empty(), "Re-run must create nothing");

        // Exactly one label per language, not two
        let labels = db.list_labels(GroupKind::Tag, "noun").expect("list");
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn test_placeholder_fill_unknown_group() {
        let db = test_db();
        let result = fill_placeholder_labels(&db, GroupKind::Category, "ghosts");
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_placeholder_marker_is_deterministic() {
        assert_eq!(placeholder_marker("kk", "animals"), "[auto:kk] animals");
        assert_eq!(
            placeholder_marker("kk", "animals"),
            placeholder_marker("kk", "animals")
        );
    }

    // ==================== Copy Fill Tests ====================

    #[test]
    fn test_copy_fill_creates_word_and_link() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "a small feline");

        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("кот".to_string());
        request.status = WordStatus::Approved;

        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        let (word_id, _link_id) = match outcome {
            ResolveOutcome::Created { word_id, link_id } => (word_id, link_id),
            other => panic!("expected Created, got {:?}", other),
        };

        let target = db.get_word(word_id).expect("target");
        assert_eq!(target.text, "кот");
        assert_eq!(target.language_code, "ru");
        // Meaning copied from the source as a starting point
        assert_eq!(target.meaning, "a small feline");
        assert!(db.has_link_to_language(cat, "ru").expect("covered"));
    }

    #[test]
    fn test_copy_fill_explicit_meaning_not_overwritten() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "a small feline");

        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("кот".to_string());
        request.meaning = Some("домашний кот".to_string());

        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        let word_id = match outcome {
            ResolveOutcome::Created { word_id, .. } => word_id,
            other => panic!("expected Created, got {:?}", other),
        };
        assert_eq!(db.get_word(word_id).expect("get").meaning, "домашний кот");
    }

    #[test]
    fn test_copy_fill_reuses_existing_word() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let kot = add_approved(&db, "кот", "ru", "existing entry");

        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("кот".to_string());
        request.status = WordStatus::Approved;

        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        match outcome {
            ResolveOutcome::Reused { word_id, .. } => assert_eq!(word_id, kot),
            other => panic!("expected Reused, got {:?}", other),
        }
        // Existing content untouched
        assert_eq!(db.get_word(kot).expect("get").meaning, "existing entry");
    }

    #[test]
    fn test_copy_fill_never_reuses_deleted_word() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let dead = add_approved(&db, "кот", "ru", "deleted entry");
        db.soft_delete_word(dead).expect("delete");

        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("кот".to_string());

        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        match outcome {
            ResolveOutcome::Created { word_id, .. } => assert_ne!(word_id, dead),
            other => panic!("expected Created, got {:?}", other),
        }
    }

    #[test]
    fn test_copy_fill_skips_when_already_covered() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let kot = add_approved(&db, "кот", "ru", "");
        db.add_link(cat, kot, "", WordStatus::Approved).expect("link");

        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("котик".to_string());

        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        assert_eq!(outcome, ResolveOutcome::Skipped);
        // No second word was created
        assert!(db.find_word("котик", "ru").expect("find").is_none());
    }

    #[test]
    fn test_copy_fill_idempotent() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");

        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("кот".to_string());
        request.status = WordStatus::Approved;

        let first = resolve_word(&db, &PrefixMatch::default(), &request).expect("first");
        assert!(matches!(first, ResolveOutcome::Created { .. }));

        let second = resolve_word(&db, &PrefixMatch::default(), &request).expect("second");
        assert_eq!(second, ResolveOutcome::Skipped);
    }

    #[test]
    fn test_copy_fill_pending_link_reused_not_duplicated() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let kot = add_approved(&db, "кот", "ru", "");
        let link = db.add_link(cat, kot, "", WordStatus::Pending).expect("link");

        // Pending link does not count as coverage, but the (from, to) pair
        // already exists, so the engine reuses it instead of conflicting.
        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("кот".to_string());

        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        match outcome {
            ResolveOutcome::Reused { link_id, .. } => assert_eq!(link_id, link),
            other => panic!("expected Reused, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_status_refused() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let mut request = ResolveRequest::new(cat, "ru");
        request.text = Some("кот".to_string());
        request.status = WordStatus::Rejected;

        let result = resolve_word(&db, &PrefixMatch::default(), &request);
        assert!(matches!(result, Err(CoreError::InvalidStatus(_))));
    }

    #[test]
    fn test_unknown_language_error() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let mut request = ResolveRequest::new(cat, "xx");
        request.text = Some("whatever".to_string());

        let result = resolve_word(&db, &PrefixMatch::default(), &request);
        assert!(matches!(result, Err(CoreError::UnknownLanguage(_))));
    }

    // ==================== Suggestion Tests ====================

    #[test]
    fn test_suggestion_prefix_match() {
        let db = test_db();
        let kot = add_approved(&db, "кот", "ru", "");
        add_approved(&db, "котёнок", "ru", "");
        let cat = add_approved(&db, "котлета", "en", "");

        // Source "котлета" shares the prefix "кот" with the ru entries;
        // alphabetically first wins.
        let request = ResolveRequest::new(cat, "ru");
        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        assert_eq!(
            outcome,
            ResolveOutcome::Suggested {
                text: "кот".to_string()
            }
        );
        let _ = kot;
    }

    #[test]
    fn test_suggestion_falls_back_to_marker() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");

        let request = ResolveRequest::new(cat, "ru");
        let outcome = resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");
        assert_eq!(
            outcome,
            ResolveOutcome::Suggested {
                text: "[auto:ru] cat".to_string()
            }
        );
    }

    #[test]
    fn test_suggestion_never_persists() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        add_approved(&db, "кот", "ru", "");

        // "cat" has no ru prefix match -> marker suggestion; either way
        // nothing may be written.
        let request = ResolveRequest::new(cat, "ru");
        resolve_word(&db, &PrefixMatch::default(), &request).expect("resolve");

        assert!(db.links_from(cat).expect("links").is_empty());
        assert!(!db.has_link_to_language(cat, "ru").expect("covered"));
    }

    #[test]
    fn test_custom_strategy_is_pluggable() {
        struct Fixed;
        impl SuggestionStrategy for Fixed {
            fn suggest(
                &self,
                _db: &Database,
                _source_text: &str,
                _target_language: &str,
            ) -> Result<Option<String>, CoreError> {
                Ok(Some("из словаря".to_string()))
            }
        }

        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let request = ResolveRequest::new(cat, "ru");
        let outcome = resolve_word(&db, &Fixed, &request).expect("resolve");
        assert_eq!(
            outcome,
            ResolveOutcome::Suggested {
                text: "из словаря".to_string()
            }
        );
    }

    // ==================== Batch Tests ====================

    #[test]
    fn test_batch_partial_failure_scenario() {
        // Spec scenario: 3 words, one referencing a nonexistent language;
        // the report shows 2 successes and 1 UnknownLanguage, not a single
        // aggregate failure.
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let dog = add_approved(&db, "dog", "en", "");
        let sun = add_approved(&db, "sun", "en", "");

        let requests = vec![
            {
                let mut r = ResolveRequest::new(cat, "ru");
                r.text = Some("кот".to_string());
                r.status = WordStatus::Approved;
                r
            },
            {
                let mut r = ResolveRequest::new(dog, "xx");
                r.text = Some("собака".to_string());
                r
            },
            {
                let mut r = ResolveRequest::new(sun, "ru");
                r.text = Some("солнце".to_string());
                r.status = WordStatus::Approved;
                r
            },
        ];

        let report = resolve_batch(&db, &PrefixMatch::default(), &requests);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes.len(), 3);

        let failure = &report.outcomes[1];
        assert_eq!(failure.word_id, dog);
        assert!(matches!(
            failure.result,
            Err(CoreError::UnknownLanguage(_))
        ));

        // The failing sibling did not roll anything back
        assert!(db.has_link_to_language(cat, "ru").expect("cat covered"));
        assert!(db.has_link_to_language(sun, "ru").expect("sun covered"));
    }

    #[test]
    fn test_batch_counts_mixed_outcomes() {
        let db = test_db();
        let cat = add_approved(&db, "cat", "en", "");
        let kot = add_approved(&db, "кот", "ru", "");
        db.add_link(cat, kot, "", WordStatus::Approved).expect("link");
        let dog = add_approved(&db, "dog", "en", "");

        let requests = vec![
            {
                // Already covered -> skipped
                let mut r = ResolveRequest::new(cat, "ru");
                r.text = Some("кошка".to_string());
                r
            },
            // No text, no prefix match -> suggested marker
            ResolveRequest::new(dog, "kk"),
        ];

        let report = resolve_batch(&db, &PrefixMatch::default(), &requests);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.suggested, 1);
        assert_eq!(report.created, 0);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_batch_empty() {
        let db = test_db();
        let report = resolve_batch(&db, &PrefixMatch::default(), &[]);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.created + report.failed, 0);
    }
}
