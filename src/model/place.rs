//! Publication places and their geocoding results

use rusqlite::Row;
use rusqlite::types::Value;
use serde::Serialize;

use super::PlaceId;
use crate::describe::{Describe, place_description};
use crate::storage::record::{Record, opt_integer, opt_real, opt_text};
use crate::storage::schema::{PLACES, TableSchema};
use crate::{Error, Result};

/// A publication place: the affiliation query that was geocoded and what it
/// resolved to.
///
/// Owns the articles published there (see `Session::articles_of_place`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    id: Option<PlaceId>,
    /// Original geocoder query
    orig: String,
    /// Number of geocoder matches for `orig`
    orig_matches: Option<i64>,
    /// Resolved place name
    #[serde(rename = "final")]
    final_name: Option<String>,
    final_matches: Option<i64>,
    lon: Option<f64>,
    lat: Option<f64>,
    description: String,
}

impl Place {
    /// Create an unresolved place for a geocoder query
    pub fn new(orig: impl Into<String>) -> Self {
        let mut place = Self {
            id: None,
            orig: orig.into(),
            orig_matches: None,
            final_name: None,
            final_matches: None,
            lon: None,
            lat: None,
            description: String::new(),
        };
        place.refresh_description();
        place
    }

    pub fn orig(&self) -> &str {
        &self.orig
    }

    pub fn orig_matches(&self) -> Option<i64> {
        self.orig_matches
    }

    pub fn final_name(&self) -> Option<&str> {
        self.final_name.as_deref()
    }

    pub fn final_matches(&self) -> Option<i64> {
        self.final_matches
    }

    pub fn lat(&self) -> Option<f64> {
        self.lat
    }

    pub fn lon(&self) -> Option<f64> {
        self.lon
    }

    pub fn set_orig(&mut self, orig: impl Into<String>) {
        self.orig = orig.into();
        self.refresh_description();
    }

    pub fn set_orig_matches(&mut self, matches: Option<i64>) {
        self.orig_matches = matches;
        self.refresh_description();
    }

    pub fn set_final_name(&mut self, final_name: Option<String>) {
        self.final_name = final_name;
        self.refresh_description();
    }

    pub fn set_final_matches(&mut self, matches: Option<i64>) {
        self.final_matches = matches;
        self.refresh_description();
    }

    pub fn set_coordinates(&mut self, lat: Option<f64>, lon: Option<f64>) {
        self.lat = lat;
        self.lon = lon;
        self.refresh_description();
    }

    /// Store a geocoding result in one step
    pub fn set_resolution(
        &mut self,
        final_name: impl Into<String>,
        final_matches: Option<i64>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) {
        self.final_name = Some(final_name.into());
        self.final_matches = final_matches;
        self.lat = lat;
        self.lon = lon;
        self.refresh_description();
    }

    fn refresh_description(&mut self) {
        self.description =
            place_description(&self.orig, self.final_name.as_deref(), self.lat, self.lon);
    }
}

impl Describe for Place {
    fn description(&self) -> &str {
        &self.description
    }
}

/// Parse a coordinate from geocoder output
pub fn parse_coordinate(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("coordinate '{}' is not a number", raw)))?;
    if !value.is_finite() {
        return Err(Error::Validation(format!("coordinate '{}' is not finite", raw)));
    }
    Ok(value)
}

fn check_range(label: &str, value: Option<f64>, bound: f64) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v.abs() > bound => Err(Error::Validation(format!(
            "{label} {v} outside [-{bound}, {bound}]"
        ))),
        _ => Ok(()),
    }
}

fn check_count(label: &str, value: Option<i64>) -> Result<()> {
    match value {
        Some(v) if v < 0 => Err(Error::Validation(format!("{label} must not be negative, got {v}"))),
        _ => Ok(()),
    }
}

impl Record for Place {
    type Id = PlaceId;

    const SCHEMA: &'static TableSchema = &PLACES;

    fn id(&self) -> Option<PlaceId> {
        self.id
    }

    fn assign_id(&mut self, id: PlaceId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.orig.clone()),
            opt_integer(self.orig_matches),
            opt_text(&self.final_name),
            opt_integer(self.final_matches),
            opt_real(self.lon),
            opt_real(self.lat),
            Value::Text(self.description.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        // the stored description is recomputed rather than trusted
        let mut place = Self {
            id: Some(row.get(0)?),
            orig: row.get(1)?,
            orig_matches: row.get(2)?,
            final_name: row.get(3)?,
            final_matches: row.get(4)?,
            lon: row.get(5)?,
            lat: row.get(6)?,
            description: String::new(),
        };
        place.refresh_description();
        Ok(place)
    }

    fn validate(&self) -> Result<()> {
        check_range("latitude", self.lat, 90.0)?;
        check_range("longitude", self.lon, 180.0)?;
        check_count("orig_matches", self.orig_matches)?;
        check_count("final_matches", self.final_matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_follows_every_setter() {
        let mut place = Place::new("boston ma");
        assert_eq!(place.description(), "boston ma");

        place.set_final_name(Some("Boston".into()));
        assert_eq!(place.description(), "Boston");

        place.set_coordinates(Some(42.36), Some(-71.06));
        assert_eq!(place.description(), "Boston: 42.36, -71.06");

        place.set_final_name(Some(String::new()));
        assert_eq!(place.description(), "boston ma");

        place.set_orig("cambridge ma");
        assert_eq!(place.description(), "cambridge ma");
    }

    #[test]
    fn test_set_resolution() {
        let mut place = Place::new("boston ma");
        place.set_resolution("Boston", Some(1), Some(42.36), Some(-71.06));
        assert_eq!(place.final_name(), Some("Boston"));
        assert_eq!(place.final_matches(), Some(1));
        assert_eq!(place.description(), "Boston: 42.36, -71.06");
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate(" 42.36 ").unwrap(), 42.36);
        assert!(matches!(parse_coordinate("north"), Err(Error::Validation(_))));
        assert!(matches!(parse_coordinate("NaN"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_ranges() {
        let mut place = Place::new("nowhere");
        place.set_coordinates(Some(91.0), Some(0.0));
        assert!(matches!(place.validate(), Err(Error::Validation(_))));

        place.set_coordinates(Some(45.0), Some(-181.0));
        assert!(place.validate().is_err());

        place.set_coordinates(Some(45.0), Some(-120.0));
        assert!(place.validate().is_ok());

        place.set_orig_matches(Some(-1));
        assert!(place.validate().is_err());
    }
}
