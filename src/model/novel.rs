use crate::model::PageModel;
use chrono::{DateTime, Utc};

/// One volume of a novel with its chapters in reading order
#[derive(Debug, Clone, PartialEq)]
pub struct BookModel {
    pub title: String,
    pub position: u32,
    pub chapters: Vec<PageModel>,
}

/// Detail record of a novel, keyed by the novel's page title
#[derive(Debug, Clone, PartialEq)]
pub struct NovelCollectionModel {
    /// Store identity; 0 until persisted
    pub id: i64,
    pub page: String,
    pub synopsis: String,
    /// Absolute URL of the cover image, if the page has one
    pub cover_url: Option<String>,
    /// Wiki file page the cover links to
    pub cover_referer: Option<String>,
    pub books: Vec<BookModel>,
    pub last_update: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
}

impl NovelCollectionModel {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            id: 0,
            page: page.into(),
            synopsis: String::new(),
            cover_url: None,
            cover_referer: None,
            books: Vec::new(),
            last_update: None,
            last_check: None,
        }
    }

    /// Total number of chapters across all books
    pub fn chapter_count(&self) -> usize {
        self.books.iter().map(|b| b.chapters.len()).sum()
    }
}
