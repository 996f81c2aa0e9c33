//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - places, articles, authors, attribs, fields, snippets
//! - attribs_fields, articles_attribs, articles_authors (pairs of keys)

pub mod predicate;
pub mod record;
pub mod schema;
pub mod sqlite;

pub use predicate::Predicate;
pub use record::{Record, RecordId};
pub use schema::{JoinTable, Side, TableSchema};
pub use sqlite::{DbStats, SqliteStore};
