//! HTTP client for the remote wiki
//!
//! This module handles all HTTP requests against the wiki, including:
//! - Building HTTP clients with proper user agent strings
//! - Laying out the API, listing, detail and image page URLs
//! - Error classification

use crate::config::{Config, UserAgentConfig};
use crate::{ConfigError, NetworkError, SyncError};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: ClientName/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.client_name, config.client_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a GET request and rejects non-success statuses
pub(crate) async fn send_get(client: &Client, url: &str) -> Result<Response, NetworkError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            NetworkError::Timeout {
                url: url.to_string(),
            }
        } else if e.is_connect() {
            NetworkError::Connect {
                url: url.to_string(),
                source: e,
            }
        } else {
            NetworkError::Http {
                url: url.to_string(),
                source: e,
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Fetches raw documents from the wiki
///
/// Every method issues exactly one GET request and returns the body
/// unparsed.
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: Client,
    base_url: Url,
    api_url: Url,
    index_url: Url,
    listing_url: Url,
}

impl SourceClient {
    /// Creates a client from the loaded configuration
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.source.timeout_secs),
        )?;
        Ok(Self::with_client(client, config)?)
    }

    /// Creates a client around an existing reqwest client
    pub fn with_client(client: Client, config: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.source.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.source.base_url, e)))?;
        let join = |path: &str| {
            base_url
                .join(path)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", path, e)))
        };

        Ok(Self {
            api_url: join(&config.source.api_path)?,
            index_url: join(&config.source.index_path)?,
            listing_url: join(&config.source.listing_path)?,
            client,
            base_url,
        })
    }

    /// Origin all relative wiki links resolve against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Fetches revision metadata for one page
    pub async fn fetch_page_info(&self, page: &str) -> Result<String, NetworkError> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("prop", "info")
            .append_pair("format", "xml")
            .append_pair("titles", page);
        self.fetch_document(url).await
    }

    /// Fetches the page carrying the novel listing
    pub async fn fetch_listing(&self) -> Result<String, NetworkError> {
        self.fetch_document(self.listing_url.clone()).await
    }

    /// Fetches the rendered detail page of a novel
    pub async fn fetch_details(&self, page: &str) -> Result<String, NetworkError> {
        let mut url = self.index_url.clone();
        url.query_pairs_mut().append_pair("title", page);
        self.fetch_document(url).await
    }

    /// Fetches the structured parse of a page (body and image list)
    pub async fn fetch_content(&self, page: &str) -> Result<String, NetworkError> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "parse")
            .append_pair("format", "xml")
            .append_pair("prop", "text|images")
            .append_pair("page", page);
        self.fetch_document(url).await
    }

    /// Fetches a wiki file page
    ///
    /// `key` is either an absolute URL or a link relative to the base URL.
    pub async fn fetch_image_page(&self, key: &str) -> Result<String, NetworkError> {
        let url = match Url::parse(key) {
            Ok(url) => url,
            Err(_) => self
                .base_url
                .join(key)
                .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", key, e)))?,
        };
        self.fetch_document(url).await
    }

    async fn fetch_document(&self, url: Url) -> Result<String, NetworkError> {
        tracing::debug!("GET {}", url);

        let response = send_get(&self.client, url.as_str()).await?;
        response.text().await.map_err(|source| NetworkError::Http {
            url: url.to_string(),
            source,
        })
    }
}
