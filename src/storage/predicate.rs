//! Column predicates for `query`

use rusqlite::types::Value;

use super::schema::TableSchema;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(String, Value),
    Ne(String, Value),
    Like(String, String),
    IsNull(String),
    IsNotNull(String),
}

impl Condition {
    fn column(&self) -> &str {
        match self {
            Condition::Eq(c, _)
            | Condition::Ne(c, _)
            | Condition::Like(c, _)
            | Condition::IsNull(c)
            | Condition::IsNotNull(c) => c,
        }
    }
}

/// A conjunction of column conditions, e.g.
/// `Predicate::new().eq("scrape_status", "done".to_string()).is_null("doi")`.
///
/// An empty predicate matches every row. Results are always ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Predicate {
    /// Match all rows
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Ne(column.to_string(), value.into()));
        self
    }

    /// SQL `LIKE` pattern match (`%` and `_` wildcards)
    pub fn like(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Like(column.to_string(), pattern.into()));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn is_not_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNotNull(column.to_string()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` matching rows
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// One page of results, pages counted from 1
    pub fn page(self, page: usize, page_size: usize) -> Self {
        self.limit(page_size)
            .offset(page.saturating_sub(1) * page_size)
    }

    /// Render the `WHERE ... ORDER BY ... LIMIT` tail and its parameters.
    ///
    /// Column names are checked against the table descriptor, so only
    /// known identifiers are ever spliced into SQL.
    pub(crate) fn to_sql(&self, schema: &TableSchema) -> Result<(String, Vec<Value>)> {
        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::new();

        for cond in &self.conditions {
            let column = cond.column();
            if !schema.has_column(column) {
                return Err(Error::Validation(format!(
                    "unknown column '{}' on {}",
                    column, schema.name
                )));
            }
            let clause = match cond {
                Condition::Eq(c, v) => {
                    params.push(v.clone());
                    format!("{c} = ?{}", params.len())
                }
                Condition::Ne(c, v) => {
                    params.push(v.clone());
                    format!("{c} IS NOT ?{}", params.len())
                }
                Condition::Like(c, p) => {
                    params.push(Value::Text(p.clone()));
                    format!("{c} LIKE ?{}", params.len())
                }
                Condition::IsNull(c) => format!("{c} IS NULL"),
                Condition::IsNotNull(c) => format!("{c} IS NOT NULL"),
            };
            clauses.push(clause);
        }

        let mut sql = String::new();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::ARTICLES;

    #[test]
    fn test_empty_predicate() {
        let (sql, params) = Predicate::new().to_sql(&ARTICLES).unwrap();
        assert_eq!(sql, " ORDER BY id");
        assert!(params.is_empty());
    }

    #[test]
    fn test_conditions_are_numbered() {
        let (sql, params) = Predicate::new()
            .eq("pmid", "123".to_string())
            .is_null("doi")
            .like("title", "%fMRI%")
            .limit(5)
            .to_sql(&ARTICLES)
            .unwrap();
        assert_eq!(
            sql,
            " WHERE pmid = ?1 AND doi IS NULL AND title LIKE ?2 ORDER BY id LIMIT 5"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_offset_and_pages() {
        let (sql, _) = Predicate::new().offset(20).to_sql(&ARTICLES).unwrap();
        assert_eq!(sql, " ORDER BY id LIMIT -1 OFFSET 20");

        let (sql, _) = Predicate::new()
            .is_not_null("pmid")
            .page(3, 10)
            .to_sql(&ARTICLES)
            .unwrap();
        assert_eq!(sql, " WHERE pmid IS NOT NULL ORDER BY id LIMIT 10 OFFSET 20");

        let (sql, _) = Predicate::new().page(0, 10).to_sql(&ARTICLES).unwrap();
        assert_eq!(sql, " ORDER BY id LIMIT 10 OFFSET 0");
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = Predicate::new()
            .eq("1=1 OR pmid", 1i64)
            .to_sql(&ARTICLES)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
