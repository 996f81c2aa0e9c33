//! Association Layer - relationships and cascade policies
//!
//! Ownership relations (one-to-many, child holds a mandatory key):
//! - place → articles
//! - article → snippets
//!
//! Join relations (many-to-many, pairs of keys):
//! - attrib ↔ field (`attribs_fields`)
//! - article ↔ attrib (`articles_attribs`)
//! - article ↔ author (`articles_authors`)
//!
//! Deleting a parent deletes its owned children first. Deleting an endpoint
//! of a join relation removes its pairs and leaves the other endpoint alone,
//! except that an attrib's fields are deleted with it.

use crate::model::{Article, Attrib, Author, Field, Place, Snippet};
use crate::storage::schema::{ARTICLES, ATTRIBS, FIELDS, JoinTable, SNIPPETS, Side};
use crate::storage::{Record, SqliteStore};
use crate::{Error, Result};

/// A record type together with the rows that depend on it.
///
/// The session drives these hooks inside a single savepoint, so a failure
/// in any of them rolls back the whole operation.
pub trait Entity: Record {
    /// Write rows owned through associations, after the record's own row
    fn store_dependents(&mut self, _store: &SqliteStore) -> Result<()> {
        Ok(())
    }

    /// Load rows owned through associations, after the record's own row
    fn load_dependents(&mut self, _store: &SqliteStore) -> Result<()> {
        Ok(())
    }

    /// Remove every row that depends on `id`, children first.
    /// The record's own row is deleted by the caller afterwards.
    fn delete_dependents(_store: &SqliteStore, _id: i64) -> Result<()> {
        Ok(())
    }
}

/// Delete a record and everything that depends on it
pub(crate) fn delete_cascade<E: Entity>(store: &SqliteStore, id: i64) -> Result<()> {
    E::delete_dependents(store, id)?;
    store.delete_row(E::SCHEMA, id)
}

impl Entity for Place {
    fn delete_dependents(store: &SqliteStore, id: i64) -> Result<()> {
        let articles = store.child_ids(&ARTICLES, "place_id", id)?;
        if !articles.is_empty() {
            tracing::info!("Deleting place {} cascades to {} article(s)", id, articles.len());
        }
        for article in articles {
            delete_cascade::<Article>(store, article)?;
        }
        Ok(())
    }
}

impl Entity for Article {
    fn delete_dependents(store: &SqliteStore, id: i64) -> Result<()> {
        for snippet in store.child_ids(&SNIPPETS, "article_id", id)? {
            store.delete_row(&SNIPPETS, snippet)?;
        }
        store.unlink_all(JoinTable::ArticlesAttribs, Side::Left, id)?;
        store.unlink_all(JoinTable::ArticlesAuthors, Side::Left, id)?;
        Ok(())
    }
}

impl Entity for Snippet {}

impl Entity for Author {
    fn delete_dependents(store: &SqliteStore, id: i64) -> Result<()> {
        store.unlink_all(JoinTable::ArticlesAuthors, Side::Right, id)?;
        Ok(())
    }
}

impl Entity for Attrib {
    /// Sync the field mapping: insert new fields, rewrite known ones, and
    /// drop fields that were removed from the mapping.
    fn store_dependents(&mut self, store: &SqliteStore) -> Result<()> {
        let attrib_id: i64 = self
            .id()
            .ok_or_else(|| Error::Integrity("attrib must be stored before its fields".into()))?
            .into();
        let previous = store.linked(JoinTable::AttribsFields, Side::Left, attrib_id)?;

        let mut current = Vec::with_capacity(self.field_count());
        for field in self.fields_mut() {
            let field_id: i64 = match field.id() {
                Some(id) if previous.contains(&id.into()) => {
                    store.update(&*field)?;
                    id.into()
                }
                _ => {
                    let id = store.insert(&*field)?;
                    field.assign_id(id);
                    id.into()
                }
            };
            store.link(JoinTable::AttribsFields, attrib_id, field_id)?;
            current.push(field_id);
        }

        for stale in previous.into_iter().filter(|id| !current.contains(id)) {
            store.unlink(JoinTable::AttribsFields, attrib_id, stale)?;
            delete_field_if_orphaned(store, stale)?;
        }
        Ok(())
    }

    fn load_dependents(&mut self, store: &SqliteStore) -> Result<()> {
        let attrib_id: i64 = match self.id() {
            Some(id) => id.into(),
            None => return Ok(()),
        };
        let fields = store
            .linked(JoinTable::AttribsFields, Side::Left, attrib_id)?
            .into_iter()
            .map(|id| store.fetch::<Field>(id.into()))
            .collect::<Result<Vec<_>>>()?;
        self.replace_fields(fields)
    }

    fn delete_dependents(store: &SqliteStore, id: i64) -> Result<()> {
        let fields = store.linked(JoinTable::AttribsFields, Side::Left, id)?;
        store.unlink_all(JoinTable::AttribsFields, Side::Left, id)?;
        for field in fields {
            delete_field_if_orphaned(store, field)?;
        }
        store.unlink_all(JoinTable::ArticlesAttribs, Side::Right, id)?;
        Ok(())
    }
}

impl Entity for Field {
    /// A field written on its own changes the description of every attrib
    /// that maps it, so those are reloaded and rewritten. Fields are only
    /// ever created through an attrib's mapping.
    fn store_dependents(&mut self, store: &SqliteStore) -> Result<()> {
        let id: i64 = self
            .id()
            .ok_or_else(|| Error::Integrity("field was never stored".into()))?
            .into();
        let attribs = store.linked(JoinTable::AttribsFields, Side::Right, id)?;
        if attribs.is_empty() {
            return Err(Error::Integrity(format!(
                "field {} ('{}') is not mapped by any attrib",
                id, self.name
            )));
        }
        for attrib in attribs {
            refresh_attrib(store, attrib)?;
        }
        Ok(())
    }

    fn delete_dependents(store: &SqliteStore, id: i64) -> Result<()> {
        let attribs = store.linked(JoinTable::AttribsFields, Side::Right, id)?;
        store.unlink_all(JoinTable::AttribsFields, Side::Right, id)?;
        for attrib in attribs {
            refresh_attrib(store, attrib)?;
        }
        Ok(())
    }
}

/// Fields have no existence outside an attrib mapping
fn delete_field_if_orphaned(store: &SqliteStore, field: i64) -> Result<()> {
    if store
        .linked(JoinTable::AttribsFields, Side::Right, field)?
        .is_empty()
    {
        store.delete_row(&FIELDS, field)?;
    }
    Ok(())
}

/// Recompute and persist an attrib's description from its stored fields
fn refresh_attrib(store: &SqliteStore, id: i64) -> Result<()> {
    let mut attrib: Attrib = store.fetch(id.into())?;
    attrib.load_dependents(store)?;
    store.update(&attrib)?;
    tracing::debug!("Refreshed description of {} {}", ATTRIBS.entity, id);
    Ok(())
}
