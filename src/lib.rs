//! # trenddb - research corpus persistence
//!
//! Stores journal articles together with their authors, publication places
//! (with geocoding results), categorized attributes and extracted text
//! snippets in a single SQLite file.
//!
//! trenddb provides:
//! - Typed entity records with explicit schema descriptors
//! - Join relations and ownership relations with cascading deletes
//! - Derived descriptions that are recomputed on every mutation
//! - A session object with explicit unit-of-work boundaries

pub mod association;
pub mod config;
pub mod describe;
pub mod model;
pub mod session;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use describe::Describe;
pub use model::{
    Article, ArticleId, Attrib, AttribId, Author, AuthorId, Field, FieldId, Place, PlaceId,
    Snippet, SnippetId,
};
pub use session::{ArticleBundle, Resolution, Session};
pub use storage::{Predicate, SqliteStore};

/// Result type alias for trenddb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for trenddb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `NotFound` error for an entity table and raw id
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            if code.code == rusqlite::ErrorCode::ConstraintViolation {
                let detail = message.clone().unwrap_or_else(|| code.to_string());
                return match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        Error::DuplicateKey(detail)
                    }
                    _ => Error::Integrity(detail),
                };
            }
        }
        Error::Storage(err)
    }
}
