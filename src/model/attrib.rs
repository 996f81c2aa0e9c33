//! Categorized attributes and their named field values

use std::collections::BTreeMap;

use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::{AttribId, FieldId};
use crate::describe::{Describe, attrib_description};
use crate::storage::record::{Record, opt_text};
use crate::storage::schema::{ATTRIBS, FIELDS, TableSchema};
use crate::{Error, Result};

/// A named scalar value belonging to an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: Option<FieldId>,
    pub name: String,
    pub value: String,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Record for Field {
    type Id = FieldId;

    const SCHEMA: &'static TableSchema = &FIELDS;

    fn id(&self) -> Option<FieldId> {
        self.id
    }

    fn assign_id(&mut self, id: FieldId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone()), Value::Text(self.value.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            value: row.get(2)?,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation("field name must not be empty".into()));
        }
        Ok(())
    }
}

/// An attribute detected in an article (a software package, an analysis
/// parameter, ...) with its extracted field values keyed by field name.
///
/// The description is rebuilt whenever the name or any field changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attrib {
    id: Option<AttribId>,
    name: String,
    category: Option<String>,
    fields: BTreeMap<String, Field>,
    description: String,
}

impl Attrib {
    pub fn new(name: impl Into<String>, category: Option<String>) -> Self {
        let mut attrib = Self {
            id: None,
            name: name.into(),
            category,
            fields: BTreeMap::new(),
            description: String::new(),
        };
        attrib.refresh_description();
        attrib
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Fields ordered by name
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|f| f.value.as_str())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.refresh_description();
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category;
        self.refresh_description();
    }

    /// Insert a field or overwrite the value of the existing field with that
    /// name. Returns the previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let previous = self.upsert(name.into(), value.into());
        self.refresh_description();
        previous
    }

    /// Upsert several fields, recomputing the description once
    pub fn merge_fields<K, V>(&mut self, fields: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in fields {
            self.upsert(name.into(), value.into());
        }
        self.refresh_description();
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let removed = self.fields.remove(name);
        self.refresh_description();
        removed
    }

    fn upsert(&mut self, name: String, value: String) -> Option<String> {
        match self.fields.get_mut(&name) {
            Some(field) => Some(std::mem::replace(&mut field.value, value)),
            None => {
                self.fields.insert(name.clone(), Field::new(name, value));
                None
            }
        }
    }

    /// Mutable access for the storage layer to record assigned field ids
    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.fields.values_mut()
    }

    /// Replace the mapping with rows loaded from storage
    pub(crate) fn replace_fields(&mut self, fields: Vec<Field>) -> Result<()> {
        let mut map = BTreeMap::new();
        for field in fields {
            if let Some(existing) = map.insert(field.name.clone(), field) {
                return Err(Error::Integrity(format!(
                    "attrib '{}' has two fields named '{}'",
                    self.name, existing.name
                )));
            }
        }
        self.fields = map;
        self.refresh_description();
        Ok(())
    }

    fn refresh_description(&mut self) {
        self.description = attrib_description(
            &self.name,
            self.fields
                .values()
                .map(|f| (f.name.as_str(), f.value.as_str())),
        );
    }
}

impl Describe for Attrib {
    fn description(&self) -> &str {
        &self.description
    }
}

impl Record for Attrib {
    type Id = AttribId;

    const SCHEMA: &'static TableSchema = &ATTRIBS;

    fn id(&self) -> Option<AttribId> {
        self.id
    }

    fn assign_id(&mut self, id: AttribId) {
        self.id = Some(id);
    }

    /// Field ids assigned in the same rolled-back write go too
    fn clear_id(&mut self) {
        self.id = None;
        for field in self.fields.values_mut() {
            field.id = None;
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            opt_text(&self.category),
            Value::Text(self.description.clone()),
        ]
    }

    /// Decodes the attribute row only; fields are attached by the
    /// association layer.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut attrib = Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            category: row.get(2)?,
            fields: BTreeMap::new(),
            description: String::new(),
        };
        attrib.refresh_description();
        Ok(attrib)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation("attrib name must not be empty".into()));
        }
        self.fields.values().try_for_each(Field::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_uses_label_field() {
        let mut attrib = Attrib::new("age", Some("demographics".into()));
        attrib.set_field("agename", "Age");
        attrib.set_field("agevalue", "34");
        assert_eq!(attrib.description(), "age: Age 34");
    }

    #[test]
    fn test_set_field_overwrites() {
        let mut attrib = Attrib::new("age", None);
        assert_eq!(attrib.set_field("agevalue", "34"), None);
        assert_eq!(attrib.set_field("agevalue", "35"), Some("34".to_string()));
        assert_eq!(attrib.field_count(), 1);
        assert_eq!(attrib.description(), "35");
    }

    #[test]
    fn test_remove_field_and_rename_refresh() {
        let mut attrib = Attrib::new("spm", Some("software".into()));
        attrib.merge_fields([("spmname", "SPM"), ("spmversion", "8")]);
        assert_eq!(attrib.description(), "spm: SPM 8");

        attrib.remove_field("spmversion");
        assert_eq!(attrib.description(), "spm: SPM");

        attrib.set_name("fsl");
        assert_eq!(attrib.description(), "SPM");
    }

    #[test]
    fn test_replace_fields_rejects_duplicates() {
        let mut attrib = Attrib::new("age", None);
        let err = attrib
            .replace_fields(vec![Field::new("agevalue", "1"), Field::new("agevalue", "2")])
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_validate_rejects_empty_field_name() {
        let mut attrib = Attrib::new("age", None);
        attrib.set_field("", "34");
        assert!(matches!(attrib.validate(), Err(Error::Validation(_))));
    }
}
