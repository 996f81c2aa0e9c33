//! SQLite storage implementation

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::predicate::Predicate;
use super::record::Record;
use super::schema::{self, JoinTable, Side, TableSchema};
use crate::{Error, Result};

/// SQLite-backed storage for the research corpus.
///
/// Every mutating helper here writes a single table; multi-table operations
/// wrap them in [`SqliteStore::atomic`].
pub struct SqliteStore {
    conn: Connection,
    savepoint_depth: Cell<usize>,
    /// Highest id handed out per table by this connection
    issued: RefCell<HashMap<&'static str, i64>>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn);
        store.initialize_schema()?;
        tracing::debug!("Opened corpus database at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self::with_connection(conn);
        store.initialize_schema()?;
        Ok(store)
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            savepoint_depth: Cell::new(0),
            issued: RefCell::new(HashMap::new()),
        }
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::CONNECTION_PRAGMAS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(&stmt, [])?;
        }
        Ok(())
    }

    /// Flush and close the connection
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| Error::from(err))
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Whether an explicit transaction or savepoint is open
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    // ========== Atomicity ==========

    /// Run `f` inside a savepoint.
    ///
    /// Commits (releases) on `Ok`, rolls back to the savepoint on `Err` and
    /// returns the original error. Savepoints nest, so an atomic engine
    /// operation can run inside a caller's unit of work.
    ///
    /// A rollback also rewinds the AUTOINCREMENT counters. They are moved
    /// forward again afterwards, so an id issued inside a rolled-back
    /// savepoint is never issued twice and records still holding it fail
    /// with `NotFound` on update.
    pub fn atomic<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let depth = self.savepoint_depth.get() + 1;
        let name = format!("trenddb_sp{depth}");
        self.conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        self.savepoint_depth.set(depth);

        let result = f();
        self.savepoint_depth.set(depth - 1);

        match result {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!("Rolling back {}: {}", name, err);
                if let Err(rollback_err) = self
                    .conn
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))
                {
                    tracing::error!("Rollback of {} failed: {}", name, rollback_err);
                }
                if let Err(seq_err) = self.restore_sequences() {
                    tracing::error!("Restoring id sequences after {} failed: {}", name, seq_err);
                }
                Err(err)
            }
        }
    }

    /// Raise each table's `sqlite_sequence` entry back to the highest id
    /// this connection has issued
    fn restore_sequences(&self) -> Result<()> {
        let issued: Vec<(&'static str, i64)> =
            self.issued.borrow().iter().map(|(t, id)| (*t, *id)).collect();
        for (table, high) in issued {
            self.conn.execute(
                "UPDATE sqlite_sequence SET seq = ?2 WHERE name = ?1 AND seq < ?2",
                params![table, high],
            )?;
            self.conn.execute(
                "INSERT INTO sqlite_sequence (name, seq) SELECT ?1, ?2 \
                 WHERE NOT EXISTS (SELECT 1 FROM sqlite_sequence WHERE name = ?1)",
                params![table, high],
            )?;
        }
        Ok(())
    }

    // ========== Row Operations ==========

    /// Insert a new row and return its assigned id
    pub fn insert<R: Record>(&self, record: &R) -> Result<R::Id> {
        let table = R::SCHEMA;
        let values = record.to_values();
        self.check_unique(table, &values, None)?;

        let placeholders = (1..=values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name,
            table.column_list(),
            placeholders
        );
        self.conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values))?;

        let id = self.conn.last_insert_rowid();
        let mut issued = self.issued.borrow_mut();
        let high = issued.entry(table.name).or_insert(id);
        *high = (*high).max(id);
        drop(issued);
        tracing::debug!("Inserted {} {}", table.entity, id);
        Ok(R::Id::from(id))
    }

    /// Get a row by id
    pub fn fetch<R: Record>(&self, id: R::Id) -> Result<R> {
        self.try_fetch(id)?
            .ok_or_else(|| Error::not_found(R::SCHEMA.entity, id))
    }

    /// Get a row by id, `None` when absent
    pub fn try_fetch<R: Record>(&self, id: R::Id) -> Result<Option<R>> {
        let table = R::SCHEMA;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            table.select_list(),
            table.name
        );
        self.conn
            .prepare_cached(&sql)?
            .query_row([id], |row| R::from_row(row))
            .optional()
            .map_err(Into::into)
    }

    /// Rows matching a predicate, ordered by id
    pub fn select<R: Record>(&self, predicate: &Predicate) -> Result<Vec<R>> {
        let table = R::SCHEMA;
        let (tail, values) = predicate.to_sql(table)?;
        let sql = format!("SELECT {} FROM {}{}", table.select_list(), table.name, tail);

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| R::from_row(row))?
            .collect::<rusqlite::Result<Vec<R>>>()?;
        Ok(rows)
    }

    /// Overwrite every column of an existing row
    pub fn update<R: Record>(&self, record: &R) -> Result<()> {
        let table = R::SCHEMA;
        let id = record.id().ok_or_else(|| {
            Error::Validation(format!("cannot update a {} that was never created", table.entity))
        })?;
        let mut values = record.to_values();
        self.check_unique(table, &values, Some(id.into()))?;

        let assignments = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c.name, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table.name,
            assignments,
            values.len() + 1
        );
        values.push(Value::Integer(id.into()));

        let changed = self
            .conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values))?;
        if changed == 0 {
            return Err(Error::not_found(table.entity, id));
        }
        tracing::debug!("Updated {} {}", table.entity, id);
        Ok(())
    }

    /// Delete a single row. Dependent rows must already be gone.
    pub fn delete_row(&self, table: &TableSchema, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table.name);
        let changed = self.conn.prepare_cached(&sql)?.execute([id])?;
        if changed == 0 {
            return Err(Error::not_found(table.entity, id));
        }
        tracing::debug!("Deleted {} {}", table.entity, id);
        Ok(())
    }

    pub fn exists(&self, table: &TableSchema, id: i64) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table.name);
        let found = self
            .conn
            .prepare_cached(&sql)?
            .query_row([id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Ids of rows whose `column` equals `parent`, ascending
    pub fn child_ids(&self, table: &TableSchema, column: &str, parent: i64) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE {} = ?1 ORDER BY id",
            table.name, column
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let ids = stmt
            .query_map([parent], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Enforce the table's unique columns, ignoring absent (NULL or empty) values
    fn check_unique(&self, table: &TableSchema, values: &[Value], own_id: Option<i64>) -> Result<()> {
        for column in table.unique {
            let Some(idx) = table.column_index(column) else {
                continue;
            };
            let value = &values[idx];
            match value {
                Value::Null => continue,
                Value::Text(text) if text.is_empty() => continue,
                _ => {}
            }

            let sql = format!(
                "SELECT id FROM {} WHERE {} = ?1 AND id IS NOT ?2 LIMIT 1",
                table.name, column
            );
            let clash: Option<i64> = self
                .conn
                .prepare_cached(&sql)?
                .query_row(params![value, own_id], |row| row.get(0))
                .optional()?;
            if let Some(other) = clash {
                return Err(Error::DuplicateKey(format!(
                    "{}.{} = {} already belongs to {} {}",
                    table.name,
                    column,
                    display_value(value),
                    table.entity,
                    other
                )));
            }
        }
        Ok(())
    }

    // ========== Join Operations ==========

    /// Store a pair. Returns `false` if the pair already existed.
    pub fn link(&self, join: JoinTable, left: i64, right: i64) -> Result<bool> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
            join.as_str(),
            join.column(Side::Left),
            join.column(Side::Right)
        );
        let inserted = self.conn.prepare_cached(&sql)?.execute([left, right])? > 0;
        if inserted {
            tracing::debug!("Linked {} ({}, {})", join, left, right);
        }
        Ok(inserted)
    }

    /// Remove a pair. Returns `false` if it was not stored.
    pub fn unlink(&self, join: JoinTable, left: i64, right: i64) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
            join.as_str(),
            join.column(Side::Left),
            join.column(Side::Right)
        );
        let removed = self.conn.prepare_cached(&sql)?.execute([left, right])? > 0;
        if removed {
            tracing::debug!("Unlinked {} ({}, {})", join, left, right);
        }
        Ok(removed)
    }

    /// Remove every pair with `id` on `side`
    pub fn unlink_all(&self, join: JoinTable, side: Side, id: i64) -> Result<usize> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", join.as_str(), join.column(side));
        let removed = self.conn.prepare_cached(&sql)?.execute([id])?;
        Ok(removed)
    }

    /// Ids on the opposite side of pairs with `id` on `side`, ascending
    pub fn linked(&self, join: JoinTable, side: Side, id: i64) -> Result<Vec<i64>> {
        let other = match side {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY {}",
            join.column(other),
            join.as_str(),
            join.column(side),
            join.column(other)
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    // ========== Statistics ==========

    /// Number of rows in an entity table
    pub fn count(&self, table: &TableSchema) -> Result<usize> {
        self.count_rows(table.name)
    }

    /// Number of pairs stored in a join table
    pub fn count_links(&self, join: JoinTable) -> Result<usize> {
        self.count_rows(join.as_str())
    }

    fn count_rows(&self, table: &'static str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let links = JoinTable::all()
            .iter()
            .map(|j| self.count_links(*j))
            .sum::<Result<usize>>()?;
        Ok(DbStats {
            places: self.count(&schema::PLACES)?,
            articles: self.count(&schema::ARTICLES)?,
            authors: self.count(&schema::AUTHORS)?,
            attribs: self.count(&schema::ATTRIBS)?,
            fields: self.count(&schema::FIELDS)?,
            snippets: self.count(&schema::SNIPPETS)?,
            links,
        })
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => format!("'{t}'"),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStats {
    pub places: usize,
    pub articles: usize,
    pub authors: usize,
    pub attribs: usize,
    pub fields: usize,
    pub snippets: usize,
    /// Rows across all join tables
    pub links: usize,
}

impl DbStats {
    /// Label/value pairs in display order
    pub fn rows(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("Places", self.places),
            ("Articles", self.articles),
            ("Authors", self.authors),
            ("Attribs", self.attribs),
            ("Fields", self.fields),
            ("Snippets", self.snippets),
            ("Links", self.links),
        ]
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (label, value) in self.rows() {
            writeln!(f, "  {}: {}", label, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, AuthorId, Place, PlaceId};

    #[test]
    fn test_insert_and_fetch() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut author = Author::new("Carp", "Joshua");
        let id = store.insert(&author).unwrap();
        author.assign_id(id);

        let fetched: Author = store.fetch(id).unwrap();
        assert_eq!(fetched, author);
        assert_eq!(store.count(&schema::AUTHORS).unwrap(), 1);
    }

    #[test]
    fn test_fetch_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.fetch::<Place>(PlaceId::from(42)).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "place", id: 42 }));
    }

    #[test]
    fn test_ids_are_not_reused() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert(&Author::new("A", "")).unwrap();
        store.delete_row(&schema::AUTHORS, first.into()).unwrap();
        let second = store.insert(&Author::new("B", "")).unwrap();
        assert!(i64::from(second) > i64::from(first));
    }

    #[test]
    fn test_atomic_rolls_back_on_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result: Result<()> = store.atomic(|| {
            store.insert(&Author::new("Ghost", ""))?;
            Err(Error::Validation("abort".into()))
        });
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.count(&schema::AUTHORS).unwrap(), 0);
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_rolled_back_ids_are_not_reissued() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ghost: Result<AuthorId> = store.atomic(|| {
            let id = store.insert(&Author::new("Ghost", ""))?;
            store.atomic(|| store.insert(&Author::new("Inner ghost", "")))?;
            Err(Error::Integrity(format!("aborted after {id}")))
        });
        assert!(ghost.is_err());

        let next = store.insert(&Author::new("Real", "")).unwrap();
        assert_eq!(i64::from(next), 3);
        assert!(!store.exists(&schema::AUTHORS, 1).unwrap());
    }

    #[test]
    fn test_atomic_nests() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .atomic(|| {
                store.insert(&Author::new("Outer", ""))?;
                let inner: Result<()> = store.atomic(|| {
                    store.insert(&Author::new("Inner", ""))?;
                    Err(Error::Validation("inner".into()))
                });
                assert!(inner.is_err());
                Ok(())
            })
            .unwrap();
        let names: Vec<String> = store
            .select::<Author>(&Predicate::new())
            .unwrap()
            .into_iter()
            .map(|a| a.last_name().to_string())
            .collect();
        assert_eq!(names, ["Outer"]);
    }

    #[test]
    fn test_link_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let place = store.insert(&Place::new("boston ma")).unwrap();
        let mut article = crate::model::Article::new(place);
        article.title = Some("Title".into());
        let article = store.insert(&article).unwrap();
        let author = store.insert(&Author::new("Carp", "Joshua")).unwrap();

        let join = JoinTable::ArticlesAuthors;
        assert!(store.link(join, article.into(), author.into()).unwrap());
        assert!(!store.link(join, article.into(), author.into()).unwrap());
        assert_eq!(store.count_links(join).unwrap(), 1);
        assert_eq!(store.linked(join, Side::Right, author.into()).unwrap(), vec![i64::from(article)]);

        assert!(store.unlink(join, article.into(), author.into()).unwrap());
        assert!(!store.unlink(join, article.into(), author.into()).unwrap());
    }

    #[test]
    fn test_link_to_missing_row_is_integrity_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let author = store.insert(&Author::new("Carp", "")).unwrap();
        let err = store
            .link(JoinTable::ArticlesAuthors, 999, author.into())
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }
}
