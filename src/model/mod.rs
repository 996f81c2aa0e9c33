//! Entity records
//!
//! Each entity is an independent struct paired with a table descriptor from
//! [`crate::storage::schema`]. Records that carry a derived description keep
//! their fields private and expose mutators that recompute it.

pub mod article;
pub mod attrib;
pub mod author;
pub mod place;
pub mod snippet;

pub use article::Article;
pub use attrib::{Attrib, Field};
pub use author::Author;
pub use place::{Place, parse_coordinate};
pub use snippet::Snippet;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<$name> for rusqlite::types::Value {
            fn from(id: $name) -> Self {
                rusqlite::types::Value::Integer(id.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::Owned(
                    rusqlite::types::Value::Integer(self.0),
                ))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

entity_id!(
    /// Primary key of `articles`
    ArticleId
);
entity_id!(
    /// Primary key of `authors`
    AuthorId
);
entity_id!(
    /// Primary key of `places`
    PlaceId
);
entity_id!(
    /// Primary key of `attribs`
    AttribId
);
entity_id!(
    /// Primary key of `fields`
    FieldId
);
entity_id!(
    /// Primary key of `snippets`
    SnippetId
);
