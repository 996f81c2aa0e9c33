//! Row mapping between entity structs and their tables

use rusqlite::Row;
use rusqlite::types::{FromSql, ToSql, Value};

use super::schema::TableSchema;
use crate::Result;

/// Strongly typed primary key of an entity table
pub trait RecordId: Copy + ToSql + FromSql + From<i64> + Into<i64> + std::fmt::Display {}

impl<T> RecordId for T where T: Copy + ToSql + FromSql + From<i64> + Into<i64> + std::fmt::Display {}

/// A struct persisted as one row of an entity table.
///
/// `to_values` and `from_row` follow the column order of `SCHEMA`;
/// `from_row` additionally reads `id` at index 0.
pub trait Record: Sized {
    type Id: RecordId;

    const SCHEMA: &'static TableSchema;

    /// `None` until the record has been created
    fn id(&self) -> Option<Self::Id>;

    fn assign_id(&mut self, id: Self::Id);

    /// Forget an id whose row was rolled back
    fn clear_id(&mut self);

    /// Column values, without `id`
    fn to_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Reject malformed field values before anything is written
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Convert an optional text column
pub(crate) fn opt_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

pub(crate) fn opt_real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

pub(crate) fn opt_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub(crate) fn opt_bool(value: Option<bool>) -> Value {
    value.map_or(Value::Null, |b| Value::Integer(i64::from(b)))
}
