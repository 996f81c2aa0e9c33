use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::{ArticleId, PlaceId};
use crate::storage::record::{Record, opt_bool, opt_real, opt_text};
use crate::storage::schema::{ARTICLES, TableSchema};
use crate::{Error, Result};

/// A journal article and everything the harvesting and scraping stages
/// learned about it.
///
/// Every article belongs to exactly one [`crate::Place`]; deleting the place
/// deletes the article. Snippets, authors and attributes hang off the
/// article through the session's association API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Option<ArticleId>,

    // Identifiers
    /// PubMed id; unique across the corpus when non-empty
    pub pmid: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,

    /// Raw PubMed XML record
    pub source_xml: Option<String>,

    // Publication date, as harvested
    pub pub_year: Option<String>,
    pub pub_month: Option<String>,
    pub pub_day: Option<String>,

    // Location
    pub affiliation: Option<String>,
    pub place_id: PlaceId,

    // Files
    pub pub_url: Option<String>,
    pub html_file: Option<String>,
    pub pdf_raw_file: Option<String>,
    pub pdf_text_file: Option<String>,

    // File validation
    pub html_score: Option<f64>,
    pub pdf_score: Option<f64>,

    // PDF processing
    pub pdf_ocr: Option<bool>,
    pub pdf_decrypted: Option<bool>,
    pub pdf_decrypt_method: Option<String>,

    pub scrape_status: Option<String>,
}

impl Article {
    pub fn new(place_id: PlaceId) -> Self {
        Self {
            id: None,
            pmid: None,
            doi: None,
            title: None,
            journal: None,
            source_xml: None,
            pub_year: None,
            pub_month: None,
            pub_day: None,
            affiliation: None,
            place_id,
            pub_url: None,
            html_file: None,
            pdf_raw_file: None,
            pdf_text_file: None,
            html_score: None,
            pdf_score: None,
            pdf_ocr: None,
            pdf_decrypted: None,
            pdf_decrypt_method: None,
            scrape_status: None,
        }
    }

    pub fn with_pmid(place_id: PlaceId, pmid: impl Into<String>) -> Self {
        Self {
            pmid: Some(pmid.into()),
            ..Self::new(place_id)
        }
    }

    /// Non-empty pmid, if any
    pub fn pmid(&self) -> Option<&str> {
        self.pmid.as_deref().filter(|p| !p.is_empty())
    }
}

impl Record for Article {
    type Id = ArticleId;

    const SCHEMA: &'static TableSchema = &ARTICLES;

    fn id(&self) -> Option<ArticleId> {
        self.id
    }

    fn assign_id(&mut self, id: ArticleId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            opt_text(&self.pmid),
            opt_text(&self.doi),
            opt_text(&self.title),
            opt_text(&self.journal),
            opt_text(&self.source_xml),
            opt_text(&self.pub_year),
            opt_text(&self.pub_month),
            opt_text(&self.pub_day),
            opt_text(&self.affiliation),
            Value::Integer(self.place_id.get()),
            opt_text(&self.pub_url),
            opt_text(&self.html_file),
            opt_text(&self.pdf_raw_file),
            opt_text(&self.pdf_text_file),
            opt_real(self.html_score),
            opt_real(self.pdf_score),
            opt_bool(self.pdf_ocr),
            opt_bool(self.pdf_decrypted),
            opt_text(&self.pdf_decrypt_method),
            opt_text(&self.scrape_status),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            pmid: row.get(1)?,
            doi: row.get(2)?,
            title: row.get(3)?,
            journal: row.get(4)?,
            source_xml: row.get(5)?,
            pub_year: row.get(6)?,
            pub_month: row.get(7)?,
            pub_day: row.get(8)?,
            affiliation: row.get(9)?,
            place_id: row.get(10)?,
            pub_url: row.get(11)?,
            html_file: row.get(12)?,
            pdf_raw_file: row.get(13)?,
            pdf_text_file: row.get(14)?,
            html_score: row.get(15)?,
            pdf_score: row.get(16)?,
            pdf_ocr: row.get(17)?,
            pdf_decrypted: row.get(18)?,
            pdf_decrypt_method: row.get(19)?,
            scrape_status: row.get(20)?,
        })
    }

    fn validate(&self) -> Result<()> {
        for (label, score) in [("html_score", self.html_score), ("pdf_score", self.pdf_score)] {
            if score.is_some_and(|s| !s.is_finite()) {
                return Err(Error::Validation(format!("{label} must be a finite number")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_count_matches_schema() {
        let article = Article::new(PlaceId::from(1));
        assert_eq!(article.to_values().len(), ARTICLES.columns.len());
        let place_idx = ARTICLES.column_index("place_id").unwrap();
        assert_eq!(article.to_values()[place_idx], Value::Integer(1));
    }

    #[test]
    fn test_validate_pmid() {
        assert!(Article::with_pmid(PlaceId::from(1), "12345678").validate().is_ok());
        assert!(Article::with_pmid(PlaceId::from(1), "").validate().is_ok());
        // pmids are opaque keys
        assert!(Article::with_pmid(PlaceId::from(1), "PMC3404452").validate().is_ok());
        assert!(Article::with_pmid(PlaceId::from(1), " 12345").validate().is_ok());
    }

    #[test]
    fn test_validate_scores() {
        let mut article = Article::new(PlaceId::from(1));
        article.pdf_score = Some(f64::NAN);
        assert!(article.validate().is_err());
        article.pdf_score = Some(0.92);
        assert!(article.validate().is_ok());
    }
}
