use super::ContentRepository;
use crate::model::{ImageModel, NovelCollectionModel};
use crate::storage::Storage;
use crate::Result;
use chrono::Utc;

impl<S: Storage + Send> ContentRepository<S> {
    /// Gets a novel's detail record
    ///
    /// A cached record is returned as is. On a miss the detail page and the
    /// page metadata are fetched, the record is stored and the cover image is
    /// prefetched. A failed cover download is logged, never returned.
    pub async fn get_novel_details(&self, page: &str) -> Result<NovelCollectionModel> {
        if let Some(novel) = self.cached_details(page)? {
            return Ok(novel);
        }

        let _guard = self.inflight.acquire(&format!("details:{}", page)).await;

        if let Some(novel) = self.cached_details(page)? {
            return Ok(novel);
        }

        self.sync_novel_details(page).await
    }

    /// Re-fetches a novel's detail record regardless of the cache
    pub async fn refresh_novel_details(&self, page: &str) -> Result<NovelCollectionModel> {
        let _guard = self.inflight.acquire(&format!("details:{}", page)).await;
        self.sync_novel_details(page).await
    }

    fn cached_details(&self, page: &str) -> Result<Option<NovelCollectionModel>> {
        let cached = self.store()?.get_novel_details(page)?;
        if cached.is_some() {
            tracing::debug!("Details of {} served from cache", page);
        }
        Ok(cached)
    }

    async fn sync_novel_details(&self, page: &str) -> Result<NovelCollectionModel> {
        tracing::info!("Syncing details of {}", page);
        let now = Utc::now();

        let document = self.source.fetch_details(page).await?;
        let mut novel = self.parser.parse_details(page, &document)?;

        let info = self.source.fetch_page_info(page).await?;
        let metadata = self.parser.parse_page_metadata(page, &info)?;

        novel.last_update = metadata.last_update;
        novel.last_check = Some(now);

        let novel = self.store()?.upsert_novel_details(&novel)?;
        tracing::info!(
            "Stored details of {} ({} books, {} chapters)",
            page,
            novel.books.len(),
            novel.chapter_count()
        );

        if let Some(cover_url) = &novel.cover_url {
            let mut cover = ImageModel::new(cover_url.as_str());
            cover.referer = novel.cover_referer.clone();
            if let Err(e) = self.fetch_embedded_image(&cover).await {
                tracing::warn!("Failed to prefetch cover of {}: {}", page, e);
            }
        }

        Ok(novel)
    }
}
