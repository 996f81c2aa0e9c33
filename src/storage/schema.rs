//! Database schema definitions
//!
//! Every table is described by a plain descriptor (table name, column list,
//! key constraints). The storage engine generates its DDL and its row SQL
//! from these descriptors instead of hand-written statements per entity.

/// Column storage class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Boolean,
}

impl SqlType {
    /// Get the SQLite type name
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            // SQLite has no boolean storage class; 0/1 integers
            SqlType::Boolean => "INTEGER",
        }
    }
}

/// A non-key column of an entity table
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub not_null: bool,
    /// Parent table for a foreign-key column
    pub references: Option<&'static str>,
}

impl ColumnDef {
    pub const fn text(name: &'static str) -> Self {
        Self::new(name, SqlType::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, SqlType::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, SqlType::Real)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, SqlType::Boolean)
    }

    const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            not_null: false,
            references: None,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mandatory reference to the owning table's `id`
    pub const fn owned_by(mut self, table: &'static str) -> Self {
        self.not_null = true;
        self.references = Some(table);
        self
    }

    fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type.as_str());
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        if let Some(parent) = self.references {
            def.push_str(&format!(" REFERENCES {parent}(id)"));
        }
        def
    }
}

/// Descriptor for an entity table.
///
/// Every entity table has an `id INTEGER PRIMARY KEY AUTOINCREMENT` column
/// that is not listed in `columns`. Ids are never reused, so ascending id
/// order is creation order.
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    /// Singular name used in error messages and logs
    pub entity: &'static str,
    pub columns: &'static [ColumnDef],
    /// Columns whose non-empty values must be unique across the table
    pub unique: &'static [&'static str],
}

impl TableSchema {
    /// Position of a column within `columns`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Whether `name` is a selectable column (including `id`)
    pub fn has_column(&self, name: &str) -> bool {
        name == "id" || self.column_index(name).is_some()
    }

    /// Comma-separated column names, without `id`
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `id` followed by every column, in the order `Record::from_row` reads them
    pub fn select_list(&self) -> String {
        format!("id, {}", self.column_list())
    }

    pub fn create_table_sql(&self) -> String {
        let mut defs = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        defs.extend(self.columns.iter().map(ColumnDef::definition));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            defs.join(",\n    ")
        )
    }

    /// Partial unique indexes: absent (NULL or empty) values never collide
    pub fn unique_index_sql(&self) -> Vec<String> {
        self.unique
            .iter()
            .map(|col| {
                format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS uq_{t}_{col} ON {t}({col}) \
                     WHERE {col} IS NOT NULL AND {col} <> ''",
                    t = self.name
                )
            })
            .collect()
    }

    /// Plain indexes on every foreign-key column
    pub fn foreign_key_index_sql(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.references.is_some())
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{t}_{col} ON {t}({col})",
                    t = self.name,
                    col = c.name
                )
            })
            .collect()
    }
}

pub const PLACES: TableSchema = TableSchema {
    name: "places",
    entity: "place",
    columns: &[
        ColumnDef::text("orig").not_null(),
        ColumnDef::integer("orig_matches"),
        ColumnDef::text("final"),
        ColumnDef::integer("final_matches"),
        ColumnDef::real("lon"),
        ColumnDef::real("lat"),
        ColumnDef::text("description").not_null(),
    ],
    unique: &[],
};

pub const ARTICLES: TableSchema = TableSchema {
    name: "articles",
    entity: "article",
    columns: &[
        ColumnDef::text("pmid"),
        ColumnDef::text("doi"),
        ColumnDef::text("title"),
        ColumnDef::text("journal"),
        ColumnDef::text("source_xml"),
        ColumnDef::text("pub_year"),
        ColumnDef::text("pub_month"),
        ColumnDef::text("pub_day"),
        ColumnDef::text("affiliation"),
        ColumnDef::integer("place_id").owned_by("places"),
        ColumnDef::text("pub_url"),
        ColumnDef::text("html_file"),
        ColumnDef::text("pdf_raw_file"),
        ColumnDef::text("pdf_text_file"),
        ColumnDef::real("html_score"),
        ColumnDef::real("pdf_score"),
        ColumnDef::boolean("pdf_ocr"),
        ColumnDef::boolean("pdf_decrypted"),
        ColumnDef::text("pdf_decrypt_method"),
        ColumnDef::text("scrape_status"),
    ],
    unique: &["pmid"],
};

pub const AUTHORS: TableSchema = TableSchema {
    name: "authors",
    entity: "author",
    columns: &[
        ColumnDef::text("last_name").not_null(),
        ColumnDef::text("first_name").not_null(),
        ColumnDef::text("description").not_null(),
    ],
    unique: &[],
};

pub const ATTRIBS: TableSchema = TableSchema {
    name: "attribs",
    entity: "attrib",
    columns: &[
        ColumnDef::text("name").not_null(),
        ColumnDef::text("category"),
        ColumnDef::text("description").not_null(),
    ],
    unique: &[],
};

pub const FIELDS: TableSchema = TableSchema {
    name: "fields",
    entity: "field",
    columns: &[
        ColumnDef::text("name").not_null(),
        ColumnDef::text("value").not_null(),
    ],
    unique: &[],
};

pub const SNIPPETS: TableSchema = TableSchema {
    name: "snippets",
    entity: "snippet",
    columns: &[
        ColumnDef::integer("article_id").owned_by("articles"),
        ColumnDef::text("name").not_null(),
        ColumnDef::text("text").not_null(),
    ],
    unique: &[],
};

/// Entity tables, parents before children
pub const ENTITY_TABLES: &[&TableSchema] =
    &[&PLACES, &ARTICLES, &AUTHORS, &ATTRIBS, &FIELDS, &SNIPPETS];

/// Which end of a join table a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Many-to-many join relations.
///
/// Each join table holds exactly two foreign-key columns and a composite
/// primary key over them, so a pair can be stored at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinTable {
    /// attrib ↔ field
    AttribsFields,
    /// article ↔ attrib
    ArticlesAttribs,
    /// article ↔ author
    ArticlesAuthors,
}

impl JoinTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinTable::AttribsFields => "attribs_fields",
            JoinTable::ArticlesAttribs => "articles_attribs",
            JoinTable::ArticlesAuthors => "articles_authors",
        }
    }

    pub fn all() -> &'static [JoinTable] {
        &[
            JoinTable::AttribsFields,
            JoinTable::ArticlesAttribs,
            JoinTable::ArticlesAuthors,
        ]
    }

    /// Key column for one side
    pub fn column(&self, side: Side) -> &'static str {
        match (self, side) {
            (JoinTable::AttribsFields, Side::Left) => "attrib_id",
            (JoinTable::AttribsFields, Side::Right) => "field_id",
            (JoinTable::ArticlesAttribs, Side::Left) => "article_id",
            (JoinTable::ArticlesAttribs, Side::Right) => "attrib_id",
            (JoinTable::ArticlesAuthors, Side::Left) => "article_id",
            (JoinTable::ArticlesAuthors, Side::Right) => "author_id",
        }
    }

    /// Entity table referenced by one side
    pub fn target(&self, side: Side) -> &'static TableSchema {
        match (self, side) {
            (JoinTable::AttribsFields, Side::Left) => &ATTRIBS,
            (JoinTable::AttribsFields, Side::Right) => &FIELDS,
            (JoinTable::ArticlesAttribs, Side::Left) => &ARTICLES,
            (JoinTable::ArticlesAttribs, Side::Right) => &ATTRIBS,
            (JoinTable::ArticlesAuthors, Side::Left) => &ARTICLES,
            (JoinTable::ArticlesAuthors, Side::Right) => &AUTHORS,
        }
    }

    pub fn create_table_sql(&self) -> String {
        let left = self.column(Side::Left);
        let right = self.column(Side::Right);
        format!(
            "CREATE TABLE IF NOT EXISTS {t} (\n    \
             {left} INTEGER NOT NULL REFERENCES {lt}(id),\n    \
             {right} INTEGER NOT NULL REFERENCES {rt}(id),\n    \
             PRIMARY KEY ({left}, {right})\n)",
            t = self.as_str(),
            lt = self.target(Side::Left).name,
            rt = self.target(Side::Right).name,
        )
    }

    /// Reverse-lookup index on the right-hand column
    pub fn index_sql(&self) -> String {
        let right = self.column(Side::Right);
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_{right} ON {t}({right})",
            t = self.as_str()
        )
    }
}

impl std::fmt::Display for JoinTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pragmas applied on every connection
pub const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<String> {
    let mut stmts: Vec<String> = ENTITY_TABLES.iter().map(|t| t.create_table_sql()).collect();
    stmts.extend(JoinTable::all().iter().map(JoinTable::create_table_sql));
    for table in ENTITY_TABLES {
        stmts.extend(table.unique_index_sql());
        stmts.extend(table.foreign_key_index_sql());
    }
    stmts.extend(JoinTable::all().iter().map(JoinTable::index_sql));
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_table_ddl() {
        let sql = SNIPPETS.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS snippets"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("article_id INTEGER NOT NULL REFERENCES articles(id)"));
    }

    #[test]
    fn test_join_table_has_only_key_columns() {
        let sql = JoinTable::ArticlesAuthors.create_table_sql();
        assert!(sql.contains("article_id INTEGER NOT NULL REFERENCES articles(id)"));
        assert!(sql.contains("author_id INTEGER NOT NULL REFERENCES authors(id)"));
        assert!(sql.contains("PRIMARY KEY (article_id, author_id)"));
        assert_eq!(sql.matches("INTEGER").count(), 2);
    }

    #[test]
    fn test_pmid_unique_index_is_partial() {
        let stmts = ARTICLES.unique_index_sql();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("ON articles(pmid)"));
        assert!(stmts[0].contains("pmid <> ''"));
    }

    #[test]
    fn test_schema_surface() {
        let names: Vec<&str> = ENTITY_TABLES.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            ["places", "articles", "authors", "attribs", "fields", "snippets"]
        );
        let joins: Vec<&str> = JoinTable::all().iter().map(|j| j.as_str()).collect();
        assert_eq!(joins, ["attribs_fields", "articles_attribs", "articles_authors"]);
        assert!(ARTICLES.has_column("id"));
        assert!(ARTICLES.has_column("pmid"));
        assert!(!ARTICLES.has_column("pmid; DROP TABLE articles"));
    }
}
