use crate::cache::DEFAULT_TTL_SECS;
use serde::Deserialize;

/// Main configuration structure for lnsync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub cache: CacheConfig,
}

/// Remote wiki location and request behavior
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Origin of the wiki (e.g., "https://www.baka-tsuki.org")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the MediaWiki API endpoint
    #[serde(rename = "api-path", default = "default_api_path")]
    pub api_path: String,

    /// Path of the page renderer (`index.php`)
    #[serde(rename = "index-path", default = "default_index_path")]
    pub index_path: String,

    /// Path of the page carrying the novel listing
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Title of the page whose freshness gates the novel listing
    #[serde(rename = "index-page", default = "default_index_page")]
    pub index_page: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the client
    #[serde(rename = "client-name")]
    pub client_name: String,

    /// Version of the client
    #[serde(rename = "client-version")]
    pub client_version: String,

    /// URL with information about the client
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Local cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory downloaded images are written to
    #[serde(rename = "asset-dir")]
    pub asset_dir: String,

    /// How long the index entry stays fresh (seconds)
    #[serde(rename = "ttl-secs", default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_api_path() -> String {
    "/project/api.php".to_string()
}

fn default_index_path() -> String {
    "/project/index.php".to_string()
}

fn default_listing_path() -> String {
    "/project".to_string()
}

fn default_index_page() -> String {
    "Main_Page".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}
