//! Error taxonomy for the search core.
//!
//! Every failure that can cross the library boundary is a `SearchError`.
//! Callers that need a stable, serializable form use `SearchError::report()`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors raised by storage access, collection building and evaluation
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Storage failure: {0}")]
    Storage(#[from] tantivy::TantivyError),

    #[error("Storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("Illegal iterator state: {0}")]
    IllegalState(String),

    #[error("Invalid annotated token stream at {position}: {message}")]
    Annotation { position: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Search cancelled after deadline")]
    Cancelled,
}

impl SearchError {
    pub fn malformed(message: impl Into<String>) -> Self {
        SearchError::MalformedPredicate(message.into())
    }

    /// Contract violation by the caller. Fires in debug builds.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(false, "illegal iterator state: {}", message);
        SearchError::IllegalState(message)
    }

    /// Stable numeric code for the error kind
    pub fn code(&self) -> u32 {
        match self {
            SearchError::Storage(_) | SearchError::Io(_) => 601,
            SearchError::Cancelled => 682,
            SearchError::IllegalState(_) => 700,
            SearchError::MalformedPredicate(_) => 830,
            SearchError::Annotation { .. } => 850,
            SearchError::Config(_) => 870,
        }
    }

    /// True for failures that only affect the segment being read
    pub fn is_storage(&self) -> bool {
        matches!(self, SearchError::Storage(_) | SearchError::Io(_))
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Code and message pair handed to front ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: u32,
    pub message: String,
}
