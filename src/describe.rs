//! Derived descriptions
//!
//! `Author`, `Place` and `Attrib` each carry a summary string that is a pure
//! function of their other fields. The functions here are the only place the
//! formatting rules live; every mutator on those records calls its rule
//! before returning, so a stored description is never stale.

/// A record with a derived, read-only description
pub trait Describe {
    fn description(&self) -> &str;
}

/// `"last, first"`, omitting an empty side
pub fn author_description(last_name: &str, first_name: &str) -> String {
    [last_name, first_name]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolved name with coordinates, resolved name alone, or the original query
pub fn place_description(
    orig: &str,
    final_name: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> String {
    // zero coordinates count as missing
    let present = |v: Option<f64>| v.filter(|x| *x != 0.0);

    match final_name.filter(|s| !s.is_empty()) {
        Some(name) => match (present(lat), present(lon)) {
            (Some(lat), Some(lon)) => format!("{name}: {lat:.2}, {lon:.2}"),
            _ => name.to_string(),
        },
        None => orig.to_string(),
    }
}

/// Suffix appended to an attribute's name to find its label field
pub const LABEL_SUFFIX: &str = "name";

/// `"{name}: {label}"` from the `{name}name` field, then the other field
/// values comma-joined, the two segments separated by a space.
pub fn attrib_description<'a>(
    name: &str,
    fields: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let label_key = format!("{name}{LABEL_SUFFIX}");
    let mut label = None;
    let mut details = Vec::new();

    for (key, value) in fields {
        if key == label_key {
            label = Some(value);
        } else {
            details.push(value);
        }
    }

    let mut segments = Vec::with_capacity(2);
    if let Some(value) = label {
        segments.push(format!("{name}: {value}"));
    }
    if !details.is_empty() {
        segments.push(details.join(", "));
    }
    segments.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_description() {
        assert_eq!(author_description("Carp", "Joshua"), "Carp, Joshua");
        assert_eq!(author_description("Carp", ""), "Carp");
        assert_eq!(author_description("", "Joshua"), "Joshua");
        assert_eq!(author_description("", ""), "");
    }

    #[test]
    fn test_place_description() {
        assert_eq!(
            place_description("boston ma", Some("Boston"), Some(42.36), Some(-71.06)),
            "Boston: 42.36, -71.06"
        );
        assert_eq!(
            place_description("boston ma", Some("Boston"), None, None),
            "Boston"
        );
        assert_eq!(
            place_description("boston ma", Some("Boston"), Some(42.36), None),
            "Boston"
        );
        assert_eq!(place_description("boston ma", Some(""), None, None), "boston ma");
        assert_eq!(place_description("boston ma", None, Some(1.0), Some(2.0)), "boston ma");
    }

    #[test]
    fn test_place_description_zero_coordinate_is_missing() {
        assert_eq!(
            place_description("accra", Some("Accra"), Some(5.6), Some(0.0)),
            "Accra"
        );
    }

    #[test]
    fn test_place_description_rounds_to_two_places() {
        assert_eq!(
            place_description("x", Some("Oxford"), Some(51.75222), Some(-1.25596)),
            "Oxford: 51.75, -1.26"
        );
    }

    #[test]
    fn test_attrib_description() {
        let fields = [("agename", "Age"), ("agevalue", "34")];
        assert_eq!(attrib_description("age", fields), "age: Age 34");
    }

    #[test]
    fn test_attrib_description_without_label() {
        let fields = [("kernel", "gaussian"), ("width", "8mm")];
        assert_eq!(attrib_description("smooth", fields), "gaussian, 8mm");
    }

    #[test]
    fn test_attrib_description_label_only() {
        let fields = [("spmname", "SPM")];
        assert_eq!(attrib_description("spm", fields), "spm: SPM");
        assert_eq!(attrib_description("spm", std::iter::empty()), "");
    }
}
