use super::ContentRepository;
use crate::model::NovelContentModel;
use crate::storage::Storage;
use crate::Result;
use chrono::Utc;

impl<S: Storage + Send> ContentRepository<S> {
    /// Gets the body of a page
    ///
    /// On a miss the structured parse is fetched and every embedded image is
    /// downloaded in document order. Images that fail to download stay in the
    /// record without a local file; the content is stored regardless.
    pub async fn get_novel_content(&self, page: &str) -> Result<NovelContentModel> {
        if let Some(content) = self.cached_content(page)? {
            return Ok(content);
        }

        let _guard = self.inflight.acquire(&format!("content:{}", page)).await;

        if let Some(content) = self.cached_content(page)? {
            return Ok(content);
        }

        self.sync_novel_content(page).await
    }

    /// Re-fetches the body of a page regardless of the cache
    pub async fn refresh_novel_content(&self, page: &str) -> Result<NovelContentModel> {
        let _guard = self.inflight.acquire(&format!("content:{}", page)).await;
        self.sync_novel_content(page).await
    }

    fn cached_content(&self, page: &str) -> Result<Option<NovelContentModel>> {
        let cached = self.store()?.get_novel_content(page)?;
        if cached.is_some() {
            tracing::debug!("Content of {} served from cache", page);
        }
        Ok(cached)
    }

    async fn sync_novel_content(&self, page: &str) -> Result<NovelContentModel> {
        tracing::info!("Syncing content of {}", page);
        let now = Utc::now();

        let document = self.source.fetch_content(page).await?;
        let mut content = self.parser.parse_content(page, &document)?;

        // Keep parent and flags of a page we already know
        let known = self.store()?.get_page(page)?;
        if let Some(owner) = known {
            content.page = owner;
        }
        content.page.last_check = Some(now);
        content.last_update = content.page.last_update;
        content.last_check = Some(now);

        let mut images = Vec::with_capacity(content.images.len());
        for image in std::mem::take(&mut content.images) {
            match self.fetch_embedded_image(&image).await {
                Ok(stored) => images.push(stored),
                Err(e) => {
                    tracing::warn!("Failed to fetch image {} for {}: {}", image.url, page, e);
                    images.push(image);
                }
            }
        }
        content.images = images;

        let content = self.store()?.upsert_novel_content(&content)?;
        tracing::info!(
            "Stored content of {} ({} images, {} missing)",
            page,
            content.images.len(),
            content.missing_images().count()
        );

        Ok(content)
    }
}
