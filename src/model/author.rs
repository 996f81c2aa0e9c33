use rusqlite::Row;
use rusqlite::types::Value;
use serde::Serialize;

use super::AuthorId;
use crate::describe::{Describe, author_description};
use crate::storage::record::Record;
use crate::storage::schema::{AUTHORS, TableSchema};

/// An article author. Linked to articles through `articles_authors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    id: Option<AuthorId>,
    last_name: String,
    first_name: String,
    description: String,
}

impl Author {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        let mut author = Self {
            id: None,
            last_name: last_name.into(),
            first_name: first_name.into(),
            description: String::new(),
        };
        author.refresh_description();
        author
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn set_last_name(&mut self, last_name: impl Into<String>) {
        self.last_name = last_name.into();
        self.refresh_description();
    }

    pub fn set_first_name(&mut self, first_name: impl Into<String>) {
        self.first_name = first_name.into();
        self.refresh_description();
    }

    fn refresh_description(&mut self) {
        self.description = author_description(&self.last_name, &self.first_name);
    }
}

impl Describe for Author {
    fn description(&self) -> &str {
        &self.description
    }
}

impl Record for Author {
    type Id = AuthorId;

    const SCHEMA: &'static TableSchema = &AUTHORS;

    fn id(&self) -> Option<AuthorId> {
        self.id
    }

    fn assign_id(&mut self, id: AuthorId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.last_name.clone()),
            Value::Text(self.first_name.clone()),
            Value::Text(self.description.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut author = Self {
            id: Some(row.get(0)?),
            last_name: row.get(1)?,
            first_name: row.get(2)?,
            description: String::new(),
        };
        author.refresh_description();
        Ok(author)
    }
}
