//! Binary asset downloads
//!
//! Images referenced by novels and chapters are downloaded into a local
//! asset directory through the [`AssetDownloader`] seam, so the repository
//! can be exercised against a fake in tests.

mod downloader;

pub use downloader::{asset_path, AssetDownloader, HttpAssetDownloader};
