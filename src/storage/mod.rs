//! Storage module, the local system of record
//!
//! This module handles all database operations for the cache, including:
//! - SQLite database initialization and schema management
//! - Keyed upserts for pages, novel details, contents and images
//! - Attribute queries (pages by type, watched pages, images by referer)
//! - Counters for cache statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{init_database, SqliteStorage};
pub use traits::{Storage, StorageError, StorageResult};

use crate::SyncError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SyncError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SyncError> {
    SqliteStorage::new(path)
}
