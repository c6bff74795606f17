use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// An image asset, keyed by its canonical URL
#[derive(Debug, Clone, PartialEq)]
pub struct ImageModel {
    /// Store identity; 0 until persisted
    pub id: i64,

    /// Canonical URL (identity key)
    pub name: String,

    /// Resolved direct-download URL
    pub url: String,

    /// Wiki file page the direct URL was resolved from (secondary key)
    pub referer: Option<String>,

    /// Where the downloaded file lives, if it has been downloaded
    pub local_path: Option<PathBuf>,

    pub last_update: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
}

impl ImageModel {
    /// Creates an image reference whose direct URL is its canonical URL
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: 0,
            name: url.clone(),
            url,
            referer: None,
            local_path: None,
            last_update: None,
            last_check: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn is_downloaded(&self) -> bool {
        self.local_path.is_some()
    }
}
