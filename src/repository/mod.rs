//! Cache-first access to wiki content
//!
//! The [`ContentRepository`] is the single entry point callers use. Every
//! read consults the local store first and only goes to the network when an
//! entry is missing (or, for the novel listing, stale):
//! - `novels`: index freshness and listing sync
//! - `details`: novel detail records and their cover image
//! - `content`: chapter bodies and their embedded images
//! - `images`: image resolution by canonical URL or file page

mod content;
mod details;
mod images;
mod novels;

use crate::assets::{AssetDownloader, HttpAssetDownloader};
use crate::cache::{FreshnessPolicy, InFlight};
use crate::config::Config;
use crate::model::{PageModel, PageType};
use crate::source::{DocumentParser, SourceClient, WikiParser};
use crate::storage::{SqliteStorage, Storage, StorageError};
use crate::Result;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

/// Local-first repository over the wiki
///
/// The store is shared behind a mutex that is never held across an await;
/// fetches for the same key are serialized through the in-flight table so
/// concurrent callers share one network round trip.
pub struct ContentRepository<S = SqliteStorage> {
    store: Arc<Mutex<S>>,
    source: SourceClient,
    parser: Arc<dyn DocumentParser>,
    downloader: Arc<dyn AssetDownloader>,
    policy: FreshnessPolicy,
    inflight: InFlight,
    index_page: String,
}

impl<S: Storage + Send> ContentRepository<S> {
    /// Creates a repository from explicit collaborators
    pub fn new(
        store: Arc<Mutex<S>>,
        source: SourceClient,
        parser: Arc<dyn DocumentParser>,
        downloader: Arc<dyn AssetDownloader>,
        policy: FreshnessPolicy,
        index_page: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source,
            parser,
            downloader,
            policy,
            inflight: InFlight::new(),
            index_page: index_page.into(),
        }
    }

    /// Creates a repository wired the way the configuration describes
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded and validated configuration
    /// * `store` - The shared local store
    ///
    /// # Returns
    ///
    /// * `Ok(ContentRepository)` - Ready to serve requests
    /// * `Err(SyncError)` - The HTTP client or source URLs could not be built
    pub fn from_config(config: &Config, store: Arc<Mutex<S>>) -> Result<Self> {
        let source = SourceClient::new(config)?;
        let parser = Arc::new(WikiParser::new(source.base_url().clone()));
        let downloader = Arc::new(HttpAssetDownloader::new(
            source.http().clone(),
            &config.cache.asset_dir,
        ));

        Ok(Self::new(
            store,
            source,
            parser,
            downloader,
            FreshnessPolicy::from_secs(config.cache.ttl_secs),
            config.source.index_page.clone(),
        ))
    }

    fn store(&self) -> Result<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    // ===== Pages =====

    /// Gets a page from the local store only
    pub fn get_page_model(&self, page: &str) -> Result<Option<PageModel>> {
        Ok(self.store()?.get_page(page)?)
    }

    /// Fetches a page's metadata from the wiki without touching the store
    pub async fn fetch_page_model(&self, page: &str) -> Result<PageModel> {
        let document = self.source.fetch_page_info(page).await?;
        Ok(self.parser.parse_page_metadata(page, &document)?)
    }

    /// Stores a page as given, user flags included
    pub fn update_page_model(&self, page: &PageModel) -> Result<PageModel> {
        let stored = self.store()?.upsert_page(page)?;
        tracing::debug!(
            "Updated page {} (watched: {}, finished: {})",
            stored.page,
            stored.is_watched,
            stored.is_finished_read
        );
        Ok(stored)
    }

    /// Gets every page the user is watching
    pub fn get_watched_novels(&self) -> Result<Vec<PageModel>> {
        Ok(self.store()?.get_watched_pages()?)
    }

    /// Sets or clears the watch flag of a page
    ///
    /// A page that is not cached yet is looked up on the wiki first.
    pub async fn set_watched(&self, page: &str, watched: bool) -> Result<PageModel> {
        let cached = self.get_page_model(page)?;
        let mut model = match cached {
            Some(model) => model,
            None => {
                let mut model = self.fetch_page_model(page).await?;
                model.page_type = PageType::Novel;
                model.parent = self.index_page.clone();
                model.last_check = Some(Utc::now());
                model
            }
        };

        model.is_watched = watched;
        self.update_page_model(&model)
    }
}
