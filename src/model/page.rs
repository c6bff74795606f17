use chrono::{DateTime, Utc};
use std::fmt;

/// Kind of wiki page tracked in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// The site index page whose freshness gates the novel listing
    Main,
    /// A novel's landing page, as found in the listing
    Novel,
    /// A chapter page discovered in a novel's detail record
    Content,
    /// Anything else
    Other,
}

impl PageType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Novel => "novel",
            Self::Content => "content",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "main" => Some(Self::Main),
            "novel" => Some(Self::Novel),
            "content" => Some(Self::Content),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A wiki page, keyed by its page title
#[derive(Debug, Clone, PartialEq)]
pub struct PageModel {
    /// Store identity; 0 until the page has been persisted
    pub id: i64,

    /// Page title as used in wiki URLs (identity key)
    pub page: String,

    /// Human readable title
    pub title: String,

    pub page_type: PageType,

    /// Key of the parent page, empty for top-level pages
    pub parent: String,

    /// Revision timestamp reported by the wiki
    pub last_update: Option<DateTime<Utc>>,

    /// When this entry was last revalidated against the wiki
    pub last_check: Option<DateTime<Utc>>,

    pub is_watched: bool,

    pub is_finished_read: bool,
}

impl PageModel {
    /// Creates an unsaved page with the title defaulting to the key
    pub fn new(page: impl Into<String>, page_type: PageType) -> Self {
        let page = page.into();
        Self {
            id: 0,
            title: page.replace('_', " "),
            page,
            page_type,
            parent: String::new(),
            last_update: None,
            last_check: None,
            is_watched: false,
            is_finished_read: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }
}
