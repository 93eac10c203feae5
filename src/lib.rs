//! Core of a multilingual dictionary: languages, words, translation links,
//! coverage statistics, and gap resolution.
//!
//! The crate owns the data model and the algorithms only. Web pages, admin
//! tooling, and media handling live elsewhere and call into this API.
//!
//! # Architecture
//!
//! - `store`: SQLite handle, schema, transaction helper
//! - `catalog`: languages, category/tag labels, interface strings
//! - `graph`: words and directed translation links with workflow status
//! - `coverage`: per-entity and aggregate translation completeness
//! - `resolve`: placeholder/copy/suggestion policies for closing gaps
//! - `detect`: character-frequency language guess used to bias search
//!
//! # Example
//!
//! ```rust,ignore
//! use dictionary_core::{Database, LanguageDetector, NewWord};
//!
//! let db = Database::new("dictionary.db")?;
//! db.add_language("en", "English")?;
//! db.add_language("ru", "Русский")?;
//!
//! let cat = db.add_word(&NewWord::new("cat", "en", "a small feline"))?;
//!
//! // Bias search toward the language the query looks like
//! let detector = LanguageDetector::new("en");
//! let hits = db.search_words("кот", Some(detector.detect("кот")), 20)?;
//! ```

mod catalog;
mod config;
mod coverage;
mod detect;
mod error;
mod graph;
mod resolve;
mod store;

pub use catalog::{GroupKind, Label, Language};
pub use config::Config;
pub use coverage::{
    language_progress, overall_report, CoverageReport, GroupRef, SectionCoverage,
    TranslationCoverage, WordRef,
};
pub use detect::LanguageDetector;
pub use error::CoreError;
pub use graph::{
    Difficulty, NewWord, TranslationLink, Word, WordChange, WordStatus,
};
pub use resolve::{
    fill_placeholder_labels, placeholder_marker, resolve_batch, resolve_word, BatchReport,
    EntityOutcome, PlaceholderFill, PrefixMatch, ResolveOutcome, ResolveRequest,
    SuggestionStrategy,
};
pub use store::Database;
