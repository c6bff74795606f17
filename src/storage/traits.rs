//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{ImageModel, NovelCollectionModel, NovelContentModel, PageModel, PageType};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Record vanished after write: {0}")]
    MissingAfterWrite(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every record is keyed by a natural key (page title, image URL). Upserts
/// assign the store identity on first insert and preserve it on update, and
/// return the record as stored.
pub trait Storage {
    // ===== Pages =====

    /// Gets a page by its key
    fn get_page(&self, page: &str) -> StorageResult<Option<PageModel>>;

    /// Gets all pages of a type, in stored order
    fn get_pages_by_type(&self, page_type: PageType) -> StorageResult<Vec<PageModel>>;

    /// Gets all pages the user is watching, in stored order
    fn get_watched_pages(&self) -> StorageResult<Vec<PageModel>>;

    /// Inserts or fully updates a page, user flags included
    fn upsert_page(&mut self, page: &PageModel) -> StorageResult<PageModel>;

    /// Inserts or updates pages coming from a network sync
    ///
    /// All pages are written in one transaction. User-owned flags
    /// (`is_watched`, `is_finished_read`) of existing rows are left untouched,
    /// and so are stored timestamps the incoming page leaves unset.
    /// The returned pages are in input order.
    fn upsert_synced_pages(&mut self, pages: &[PageModel]) -> StorageResult<Vec<PageModel>>;

    // ===== Novel details =====

    /// Gets a novel's detail record with its books and chapters
    fn get_novel_details(&self, page: &str) -> StorageResult<Option<NovelCollectionModel>>;

    /// Replaces a novel's detail record wholesale
    ///
    /// Chapter pages are written in the same transaction. A chapter link to a
    /// page already stored keeps that page's type and parent.
    fn upsert_novel_details(
        &mut self,
        novel: &NovelCollectionModel,
    ) -> StorageResult<NovelCollectionModel>;

    // ===== Novel contents =====

    /// Gets the stored body of a page
    fn get_novel_content(&self, page: &str) -> StorageResult<Option<NovelContentModel>>;

    /// Replaces the stored body of a page together with its image references
    fn upsert_novel_content(
        &mut self,
        content: &NovelContentModel,
    ) -> StorageResult<NovelContentModel>;

    // ===== Images =====

    /// Gets an image by its canonical URL
    fn get_image(&self, name: &str) -> StorageResult<Option<ImageModel>>;

    /// Gets the first image stored with the given referer
    fn get_image_by_referer(&self, referer: &str) -> StorageResult<Option<ImageModel>>;

    /// Inserts or updates an image
    ///
    /// A missing referer or local path on the update does not erase a
    /// previously stored one.
    fn upsert_image(&mut self, image: &ImageModel) -> StorageResult<ImageModel>;

    // ===== Statistics =====

    /// Counts pages of a type
    fn count_pages_by_type(&self, page_type: PageType) -> StorageResult<u64>;

    /// Counts watched pages
    fn count_watched_pages(&self) -> StorageResult<u64>;

    /// Counts stored novel detail records
    fn count_novel_details(&self) -> StorageResult<u64>;

    /// Counts stored content bodies
    fn count_novel_contents(&self) -> StorageResult<u64>;

    /// Counts stored images and how many of them have a local file
    fn count_images(&self) -> StorageResult<(u64, u64)>;
}
