//! lnsync: local-first synchronization for wiki-hosted light novels
//!
//! This crate keeps a local SQLite cache of a MediaWiki-style novel site.
//! Every read goes through the [`ContentRepository`], which serves cached
//! records while they are fresh and transparently re-fetches, parses and
//! persists them when they are missing or stale.

pub mod assets;
pub mod cache;
pub mod config;
pub mod model;
pub mod output;
pub mod repository;
pub mod source;
pub mod storage;

use thiserror::Error;

/// Main error type for lnsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Transport failures while talking to the remote wiki
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {source}")]
    Connect { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// A fetched document did not have the expected shape
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Missing {element} in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    #[error("Page does not exist on the remote wiki: {0}")]
    MissingPage(String),

    #[error("Remote API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Invalid URL '{0}' in document")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(&'static str),
}

/// Binary asset download failures
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failed to download {url}: {source}")]
    Download { url: String, source: NetworkError },

    #[error("Failed to write asset {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid asset URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for lnsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for parser operations
pub type ParseResult<T> = std::result::Result<T, ParseError>;

// Re-export commonly used types
pub use cache::FreshnessPolicy;
pub use config::Config;
pub use model::{BookModel, ImageModel, NovelCollectionModel, NovelContentModel, PageModel, PageType};
pub use repository::ContentRepository;
pub use storage::{SqliteStorage, Storage};
