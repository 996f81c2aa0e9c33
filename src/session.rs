//! Persistence Session - the handle callers use for every entity operation
//!
//! A `Session` owns the single storage connection of the process. It is
//! opened once at startup and passed by reference to whatever needs
//! storage. Each `create`/`update`/`delete` is atomic together with its
//! cascades; [`Session::transaction`] groups several of them into one unit
//! of work.

use std::path::Path;

use crate::association::{self, Entity};
use crate::model::{
    Article, ArticleId, Attrib, AttribId, Author, AuthorId, Field, Place, PlaceId, Snippet,
    SnippetId,
};
use crate::storage::schema::{ARTICLES, JoinTable, PLACES, Side};
use crate::storage::{DbStats, Predicate, Record, SqliteStore, TableSchema};
use crate::{Describe, Error, Result};

/// Geocoding result for a place query
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub final_name: String,
    pub final_matches: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Resolution {
    pub fn new(final_name: impl Into<String>) -> Self {
        Self {
            final_name: final_name.into(),
            final_matches: None,
            lat: None,
            lon: None,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn with_matches(mut self, matches: i64) -> Self {
        self.final_matches = Some(matches);
        self
    }
}

/// One article with everything harvested for it, ingested as a unit.
///
/// Authors and attribs that already have an id are written back (so fields
/// merged into a stored attrib are kept) and attached; the others are
/// created first.
#[derive(Debug, Clone)]
pub struct ArticleBundle {
    pub article: Article,
    pub authors: Vec<Author>,
    pub attribs: Vec<Attrib>,
    /// `(name, text)` pairs, stored in order
    pub snippets: Vec<(String, String)>,
}

impl ArticleBundle {
    pub fn new(article: Article) -> Self {
        Self {
            article,
            authors: Vec::new(),
            attribs: Vec::new(),
            snippets: Vec::new(),
        }
    }
}

/// Process-wide persistence context
pub struct Session {
    store: SqliteStore,
}

impl Session {
    /// Open (or create) the corpus database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = SqliteStore::open(path)?;
        tracing::info!("Session opened on {}", path.display());
        Ok(Self { store })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: SqliteStore::open_in_memory()?,
        })
    }

    /// Flush and close the connection
    pub fn close(self) -> Result<()> {
        if self.store.in_transaction() {
            return Err(Error::Integrity(
                "cannot close a session with an open transaction".into(),
            ));
        }
        self.store.close()
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Run a unit of work: everything `f` writes is committed together, or
    /// rolled back together if it returns an error.
    pub fn transaction<T>(&self, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
        self.store.atomic(|| f(self))
    }

    // ========== Generic Entity Operations ==========

    /// Persist a new record and assign its id
    pub fn create<E: Entity>(&self, record: &mut E) -> Result<E::Id> {
        if let Some(id) = record.id() {
            return Err(Error::Validation(format!(
                "{} {} has already been created",
                E::SCHEMA.entity,
                id
            )));
        }
        record.validate()?;
        let result = self.store.atomic(|| {
            let id = self.store.insert(&*record)?;
            record.assign_id(id);
            record.store_dependents(&self.store)?;
            Ok(id)
        });
        if result.is_err() {
            // the rows were rolled back, so the record must not look stored
            record.clear_id();
        }
        result
    }

    /// Get a record by id
    pub fn get<E: Entity>(&self, id: E::Id) -> Result<E> {
        let mut record: E = self.store.fetch(id)?;
        record.load_dependents(&self.store)?;
        Ok(record)
    }

    /// Write every field of an existing record
    pub fn update<E: Entity>(&self, record: &mut E) -> Result<()> {
        record.validate()?;
        self.store.atomic(|| {
            self.store.update(&*record)?;
            record.store_dependents(&self.store)
        })
    }

    /// Delete a record, cascading to the rows that depend on it
    pub fn delete<E: Entity>(&self, id: E::Id) -> Result<()> {
        let raw: i64 = id.into();
        if !self.store.exists(E::SCHEMA, raw)? {
            return Err(Error::not_found(E::SCHEMA.entity, raw));
        }
        self.store
            .atomic(|| association::delete_cascade::<E>(&self.store, raw))?;
        tracing::info!("Deleted {} {}", E::SCHEMA.entity, raw);
        Ok(())
    }

    /// Records matching `predicate`, ordered by id
    pub fn query<E: Entity>(&self, predicate: &Predicate) -> Result<Vec<E>> {
        let mut records: Vec<E> = self.store.select(predicate)?;
        for record in &mut records {
            record.load_dependents(&self.store)?;
        }
        Ok(records)
    }

    fn require(&self, table: &TableSchema, id: i64) -> Result<()> {
        if self.store.exists(table, id)? {
            Ok(())
        } else {
            Err(Error::not_found(table.entity, id))
        }
    }

    // ========== Lookups ==========

    pub fn find_article_by_pmid(&self, pmid: &str) -> Result<Option<Article>> {
        if pmid.is_empty() {
            return Ok(None);
        }
        let predicate = Predicate::new().eq("pmid", pmid.to_string()).limit(1);
        Ok(self.query::<Article>(&predicate)?.into_iter().next())
    }

    /// Oldest place created for an original query string
    pub fn find_place_by_orig(&self, orig: &str) -> Result<Option<Place>> {
        let predicate = Predicate::new().eq("orig", orig.to_string()).limit(1);
        Ok(self.query::<Place>(&predicate)?.into_iter().next())
    }

    /// The place for a geocoder query, created when absent
    pub fn place_for_query(&self, orig: &str, matches: Option<i64>) -> Result<Place> {
        if let Some(place) = self.find_place_by_orig(orig)? {
            return Ok(place);
        }
        let mut place = Place::new(orig);
        place.set_orig_matches(matches);
        self.create(&mut place)?;
        Ok(place)
    }

    /// Attach a geocoding result to the place for `orig`
    pub fn resolve_place(&self, orig: &str, resolution: Resolution) -> Result<Place> {
        self.transaction(|session| {
            let mut place = session.place_for_query(orig, None)?;
            place.set_resolution(
                resolution.final_name,
                resolution.final_matches,
                resolution.lat,
                resolution.lon,
            );
            session.update(&mut place)?;
            tracing::info!("Resolved '{}' to '{}'", orig, place.description());
            Ok(place)
        })
    }

    // ========== Ownership Relations ==========

    /// Articles of a place in creation order
    pub fn articles_of_place(&self, place: PlaceId) -> Result<Vec<Article>> {
        self.require(&PLACES, place.get())?;
        self.query(&Predicate::new().eq("place_id", place))
    }

    pub fn add_snippet(
        &self,
        article: ArticleId,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Snippet> {
        self.require(&ARTICLES, article.get())?;
        let mut snippet = Snippet::new(article, name, text);
        self.create(&mut snippet)?;
        Ok(snippet)
    }

    /// Snippets of an article in creation order
    pub fn snippets_of(&self, article: ArticleId) -> Result<Vec<Snippet>> {
        self.require(&ARTICLES, article.get())?;
        self.query(&Predicate::new().eq("article_id", article))
    }

    pub fn remove_snippet(&self, snippet: SnippetId) -> Result<()> {
        self.delete::<Snippet>(snippet)
    }

    // ========== Join Relations ==========

    fn attach(&self, join: JoinTable, left: i64, right: i64) -> Result<bool> {
        self.require(join.target(Side::Left), left)?;
        self.require(join.target(Side::Right), right)?;
        self.store.link(join, left, right)
    }

    fn linked_records<E: Entity>(&self, join: JoinTable, side: Side, id: i64) -> Result<Vec<E>> {
        self.require(join.target(side), id)?;
        self.store
            .linked(join, side, id)?
            .into_iter()
            .map(|other| self.get::<E>(E::Id::from(other)))
            .collect()
    }

    /// Returns `false` if the author was already attached
    pub fn attach_author(&self, article: ArticleId, author: AuthorId) -> Result<bool> {
        self.attach(JoinTable::ArticlesAuthors, article.get(), author.get())
    }

    /// Returns `false` if the author was not attached
    pub fn detach_author(&self, article: ArticleId, author: AuthorId) -> Result<bool> {
        self.store
            .unlink(JoinTable::ArticlesAuthors, article.get(), author.get())
    }

    pub fn authors_of(&self, article: ArticleId) -> Result<Vec<Author>> {
        self.linked_records(JoinTable::ArticlesAuthors, Side::Left, article.get())
    }

    pub fn articles_by_author(&self, author: AuthorId) -> Result<Vec<Article>> {
        self.linked_records(JoinTable::ArticlesAuthors, Side::Right, author.get())
    }

    /// Returns `false` if the attrib was already attached
    pub fn attach_attrib(&self, article: ArticleId, attrib: AttribId) -> Result<bool> {
        self.attach(JoinTable::ArticlesAttribs, article.get(), attrib.get())
    }

    /// Returns `false` if the attrib was not attached
    pub fn detach_attrib(&self, article: ArticleId, attrib: AttribId) -> Result<bool> {
        self.store
            .unlink(JoinTable::ArticlesAttribs, article.get(), attrib.get())
    }

    pub fn attribs_of(&self, article: ArticleId) -> Result<Vec<Attrib>> {
        self.linked_records(JoinTable::ArticlesAttribs, Side::Left, article.get())
    }

    pub fn articles_with_attrib(&self, attrib: AttribId) -> Result<Vec<Article>> {
        self.linked_records(JoinTable::ArticlesAttribs, Side::Right, attrib.get())
    }

    // ========== Attrib Fields ==========

    /// Set one field of a stored attrib and persist it
    pub fn set_field(
        &self,
        attrib: AttribId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Attrib> {
        let mut record: Attrib = self.get(attrib)?;
        record.set_field(name, value);
        self.update(&mut record)?;
        Ok(record)
    }

    /// Merge extracted fields into a stored attrib
    pub fn merge_fields<K, V>(
        &self,
        attrib: AttribId,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Attrib>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut record: Attrib = self.get(attrib)?;
        record.merge_fields(fields);
        self.update(&mut record)?;
        Ok(record)
    }

    /// Detach a field from a stored attrib, deleting the field row
    pub fn remove_field(&self, attrib: AttribId, name: &str) -> Result<Option<Field>> {
        let mut record: Attrib = self.get(attrib)?;
        let removed = record.remove_field(name);
        if removed.is_some() {
            self.update(&mut record)?;
        }
        Ok(removed)
    }

    // ========== Ingestion ==========

    /// Store an article with its authors, attribs and snippets in one
    /// transaction
    pub fn ingest(&self, bundle: ArticleBundle) -> Result<ArticleId> {
        let ArticleBundle {
            mut article,
            authors,
            attribs,
            snippets,
        } = bundle;

        let article_id = self.transaction(|session| {
            let article_id = session.create(&mut article)?;

            for mut author in authors {
                let author_id = match author.id() {
                    Some(id) => {
                        session.update(&mut author)?;
                        id
                    }
                    None => session.create(&mut author)?,
                };
                session.attach_author(article_id, author_id)?;
            }
            for mut attrib in attribs {
                let attrib_id = match attrib.id() {
                    Some(id) => {
                        session.update(&mut attrib)?;
                        id
                    }
                    None => session.create(&mut attrib)?,
                };
                session.attach_attrib(article_id, attrib_id)?;
            }
            for (name, text) in snippets {
                session.add_snippet(article_id, name, text)?;
            }
            Ok(article_id)
        })?;

        tracing::info!(
            "Ingested article {} (pmid {})",
            article_id,
            article.pmid().unwrap_or("-")
        );
        Ok(article_id)
    }

    // ========== Statistics ==========

    pub fn stats(&self) -> Result<DbStats> {
        self.store.stats()
    }

    /// Number of rows in an entity table
    pub fn count<E: Entity>(&self) -> Result<usize> {
        self.store.count(E::SCHEMA)
    }

    /// Authors matching a last name, for de-duplication by callers
    pub fn find_authors(&self, last_name: &str) -> Result<Vec<Author>> {
        self.query(&Predicate::new().eq("last_name", last_name.to_string()))
    }

    /// Attribs of one category
    pub fn attribs_in_category(&self, category: &str) -> Result<Vec<Attrib>> {
        self.query(&Predicate::new().eq("category", category.to_string()))
    }

    /// Whether a record exists
    pub fn contains<E: Entity>(&self, id: E::Id) -> Result<bool> {
        self.store.exists(E::SCHEMA, id.into())
    }
}
