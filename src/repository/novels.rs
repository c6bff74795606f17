use super::ContentRepository;
use crate::model::{PageModel, PageType};
use crate::storage::Storage;
use crate::Result;
use chrono::Utc;

const INDEX_KEY: &str = "index";

impl<S: Storage + Send> ContentRepository<S> {
    /// Gets the novel listing
    ///
    /// The cached listing is served while the index page entry is fresh.
    /// Otherwise (or when `force_refresh` is set) the index metadata and the
    /// listing are fetched and written together; a failed fetch leaves the
    /// store untouched.
    pub async fn get_novels(&self, force_refresh: bool) -> Result<Vec<PageModel>> {
        if !force_refresh {
            if let Some(novels) = self.cached_listing_if_fresh()? {
                return Ok(novels);
            }
        }

        let _guard = self.inflight.acquire(INDEX_KEY).await;

        // Another task may have synced while we waited
        if !force_refresh {
            if let Some(novels) = self.cached_listing_if_fresh()? {
                return Ok(novels);
            }
        }

        self.sync_novels().await
    }

    fn cached_listing_if_fresh(&self) -> Result<Option<Vec<PageModel>>> {
        let store = self.store()?;
        let index = store.get_page(&self.index_page)?;

        if self
            .policy
            .needs_refresh(index.and_then(|page| page.last_check), Utc::now())
        {
            return Ok(None);
        }

        tracing::debug!("Index page {} is fresh, serving cached listing", self.index_page);
        Ok(Some(store.get_pages_by_type(PageType::Novel)?))
    }

    async fn sync_novels(&self) -> Result<Vec<PageModel>> {
        tracing::info!("Syncing novel listing");
        let now = Utc::now();

        let info = self.source.fetch_page_info(&self.index_page).await?;
        let mut index = self.parser.parse_page_metadata(&self.index_page, &info)?;

        let listing = self.source.fetch_listing().await?;
        let novels = self.parser.parse_listing(&listing)?;

        index.page_type = PageType::Main;
        index.parent = String::new();
        index.last_check = Some(now);

        let mut batch = Vec::with_capacity(novels.len() + 1);
        batch.push(index);
        batch.extend(
            novels
                .into_iter()
                .filter(|novel| novel.page != self.index_page)
                .map(|mut novel| {
                    novel.parent = self.index_page.clone();
                    novel.last_check = Some(now);
                    novel
                }),
        );

        let stored = self.store()?.upsert_synced_pages(&batch)?;
        let novels: Vec<PageModel> = stored.into_iter().skip(1).collect();

        tracing::info!("Synced {} novels", novels.len());
        Ok(novels)
    }
}
