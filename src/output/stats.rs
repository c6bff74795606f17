//! Statistics generation from the cache database
//!
//! This module provides functionality for extracting and displaying
//! cache statistics from the storage layer.

use crate::model::PageType;
use crate::storage::Storage;
use crate::SyncError;
use std::collections::HashMap;

/// Cache statistics summary
#[derive(Debug, Clone, Default)]
pub struct CacheStatistics {
    /// Count of pages by type
    pub pages_by_type: HashMap<PageType, u64>,

    /// Pages the user is watching
    pub watched_pages: u64,

    /// Stored novel detail records
    pub novel_details: u64,

    /// Stored page bodies
    pub novel_contents: u64,

    /// Known images
    pub images: u64,

    /// Images with a local file
    pub images_downloaded: u64,
}

impl CacheStatistics {
    /// Total number of cached pages
    pub fn total_pages(&self) -> u64 {
        self.pages_by_type.values().sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CacheStatistics)` - Successfully loaded statistics
/// * `Err(SyncError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CacheStatistics, SyncError> {
    let mut pages_by_type = HashMap::new();

    for page_type in [
        PageType::Main,
        PageType::Novel,
        PageType::Content,
        PageType::Other,
    ] {
        let count = storage.count_pages_by_type(page_type)?;
        if count > 0 {
            pages_by_type.insert(page_type, count);
        }
    }

    let (images, images_downloaded) = storage.count_images()?;

    Ok(CacheStatistics {
        pages_by_type,
        watched_pages: storage.count_watched_pages()?,
        novel_details: storage.count_novel_details()?,
        novel_contents: storage.count_novel_contents()?,
        images,
        images_downloaded,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CacheStatistics) {
    println!("=== Cache Statistics ===\n");

    println!("Pages ({} total):", stats.total_pages());
    let mut type_counts: Vec<_> = stats.pages_by_type.iter().collect();
    type_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (page_type, count) in type_counts {
        println!("  {}: {}", page_type, count);
    }
    println!("  watched: {}", stats.watched_pages);
    println!();

    println!("Records:");
    println!("  Novel details: {}", stats.novel_details);
    println!("  Page contents: {}", stats.novel_contents);
    println!();

    let downloaded_rate = if stats.images > 0 {
        (stats.images_downloaded as f64 / stats.images as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Images: {} known, {} downloaded ({:.1}%)",
        stats.images, stats.images_downloaded, downloaded_rate
    );
}
