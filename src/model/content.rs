use crate::model::{ImageModel, PageModel};
use chrono::{DateTime, Utc};

/// Rendered body of one wiki page
///
/// `page` is a snapshot of the owning page at the time the content was
/// stored; the pages table stays the system of record for it.
#[derive(Debug, Clone, PartialEq)]
pub struct NovelContentModel {
    /// Store identity; 0 until persisted
    pub id: i64,
    pub page: PageModel,
    /// Body HTML as rendered by the wiki
    pub content: String,
    /// Embedded images in document order
    pub images: Vec<ImageModel>,
    pub last_update: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
}

impl NovelContentModel {
    pub fn new(page: PageModel, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            page,
            content: content.into(),
            images: Vec::new(),
            last_update: None,
            last_check: None,
        }
    }

    /// Key of the owning page
    pub fn key(&self) -> &str {
        &self.page.page
    }

    /// Images that could not be downloaded yet
    pub fn missing_images(&self) -> impl Iterator<Item = &ImageModel> {
        self.images.iter().filter(|image| !image.is_downloaded())
    }
}
