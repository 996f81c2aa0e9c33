use tabled::{Table, Tabled, settings::Style};

use crate::storage::DbStats;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Field")]
    pub label: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            label: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Row counts per table
pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    for (table, count) in stats.rows() {
        builder.add_row(table, &count.to_string());
    }
    builder.add_row("Total", &stats.rows().iter().map(|(_, n)| n).sum::<usize>().to_string());
    builder.build()
}

/// Render a JSON object as a two-column table, skipping nulls.
///
/// Nested values are shown as compact JSON.
pub fn record_table(record: &serde_json::Value) -> String {
    let mut builder = TableBuilder::new();
    if let serde_json::Value::Object(map) = record {
        for (key, value) in map {
            let shown = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            builder.add_row(key, &shown);
        }
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_table_skips_nulls() {
        let record = serde_json::json!({"title": "Pain", "doi": null, "pub_year": 2012});
        let table = record_table(&record);
        assert!(table.contains("Pain"));
        assert!(table.contains("2012"));
        assert!(!table.contains("doi"));
    }

    #[test]
    fn test_empty_builder_renders_nothing() {
        assert_eq!(TableBuilder::new().build(), "");
        assert_eq!(record_table(&serde_json::json!([1, 2])), "");
    }
}
