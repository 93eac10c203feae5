//! Error types for the dictionary core.
//!
//! Every core operation returns `Result<T, CoreError>`. The variants form a
//! closed set so callers (and batch reports) can match on the failure kind
//! instead of parsing message strings. Storage failures are wrapped
//! transparently and propagate unmodified; retry policy belongs to the
//! caller, not the core.

use thiserror::Error;

/// Closed error set for all core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced language, word, group or link does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A duplicate identity violates a uniqueness invariant.
    #[error("{entity} already exists: {id}")]
    Conflict { entity: &'static str, id: String },

    /// A self-referential or otherwise nonsensical translation link.
    #[error("invalid link: {0}")]
    InvalidLink(String),

    /// An operation referenced a language code that is not registered.
    #[error("unknown language code: {0}")]
    UnknownLanguage(String),

    /// A workflow status value (or transition) outside the closed set.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// A malformed interface-string key.
    #[error("invalid interface key: {0}")]
    InvalidKey(String),

    /// Underlying storage failure, propagated unmodified.
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl CoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn conflict(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::Conflict {
            entity,
            id: id.into(),
        }
    }
}
