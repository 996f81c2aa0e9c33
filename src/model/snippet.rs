use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::{ArticleId, SnippetId};
use crate::storage::record::Record;
use crate::storage::schema::{SNIPPETS, TableSchema};

/// A named passage of text extracted from an article's source document.
///
/// Owned by exactly one article and deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: Option<SnippetId>,
    pub article_id: ArticleId,
    pub name: String,
    pub text: String,
}

impl Snippet {
    pub fn new(article_id: ArticleId, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            article_id,
            name: name.into(),
            text: text.into(),
        }
    }

    /// First 50 characters of the text, for listings
    pub fn preview(&self) -> &str {
        match self.text.char_indices().nth(50) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }
}

impl Record for Snippet {
    type Id = SnippetId;

    const SCHEMA: &'static TableSchema = &SNIPPETS;

    fn id(&self) -> Option<SnippetId> {
        self.id
    }

    fn assign_id(&mut self, id: SnippetId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.article_id.get()),
            Value::Text(self.name.clone()),
            Value::Text(self.text.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            article_id: row.get(1)?,
            name: row.get(2)?,
            text: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        let snippet = Snippet::new(ArticleId::from(1), "methods", "é".repeat(60));
        assert_eq!(snippet.preview().chars().count(), 50);

        let short = Snippet::new(ArticleId::from(1), "methods", "short");
        assert_eq!(short.preview(), "short");
    }
}
