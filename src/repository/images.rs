use super::ContentRepository;
use crate::model::ImageModel;
use crate::storage::Storage;
use crate::Result;
use chrono::Utc;

impl<S: Storage + Send> ContentRepository<S> {
    /// Downloads and stores one embedded image
    ///
    /// An image already downloaded under the same canonical URL is reused,
    /// and gains the referer of `image` if it had none. The referer of
    /// `image`, if any, is kept on the stored record.
    pub async fn fetch_embedded_image(&self, image: &ImageModel) -> Result<ImageModel> {
        if let Some(cached) = self.downloaded_image(&image.name)? {
            return self.link_referer(cached, image);
        }

        let _guard = self.inflight.acquire(&format!("image:{}", image.name)).await;

        if let Some(cached) = self.downloaded_image(&image.name)? {
            return self.link_referer(cached, image);
        }

        let now = Utc::now();
        let mut downloaded = self.downloader.download(&image.url).await?;
        downloaded.name = image.name.clone();
        downloaded.referer = image.referer.clone();
        downloaded.last_update = Some(now);
        downloaded.last_check = Some(now);

        Ok(self.store()?.upsert_image(&downloaded)?)
    }

    /// Resolves an image by canonical URL or by the file page it came from
    ///
    /// Lookup order is canonical URL, then referer, then the network: the
    /// file page is fetched and its direct URL resolved. If that URL is
    /// already stored the record just gains the referer; otherwise the image
    /// is downloaded.
    pub async fn get_image(&self, key: &str) -> Result<ImageModel> {
        if let Some(image) = self.cached_image(key)? {
            return Ok(image);
        }

        let _guard = self.inflight.acquire(&format!("image:{}", key)).await;

        if let Some(image) = self.cached_image(key)? {
            return Ok(image);
        }

        tracing::info!("Resolving image {}", key);
        let now = Utc::now();

        let document = self.source.fetch_image_page(key).await?;
        let direct_url = self.parser.parse_image_page(&document)?;

        let existing = self.store()?.get_image(&direct_url)?;
        let mut image = match existing {
            Some(image) => image,
            None => {
                let mut image = self.downloader.download(&direct_url).await?;
                image.last_update = Some(now);
                image
            }
        };

        image.referer = Some(key.to_string());
        image.last_check = Some(now);

        Ok(self.store()?.upsert_image(&image)?)
    }

    fn cached_image(&self, key: &str) -> Result<Option<ImageModel>> {
        let store = self.store()?;
        if let Some(image) = store.get_image(key)? {
            tracing::debug!("Image {} served from cache", key);
            return Ok(Some(image));
        }

        let by_referer = store.get_image_by_referer(key)?;
        if by_referer.is_some() {
            tracing::debug!("Image {} served from cache by referer", key);
        }
        Ok(by_referer)
    }

    /// Records the referer of `image` on a stored record that has none
    fn link_referer(&self, cached: ImageModel, image: &ImageModel) -> Result<ImageModel> {
        if cached.referer.is_some() || image.referer.is_none() {
            return Ok(cached);
        }
        let linked = ImageModel {
            referer: image.referer.clone(),
            ..cached
        };
        Ok(self.store()?.upsert_image(&linked)?)
    }

    fn downloaded_image(&self, name: &str) -> Result<Option<ImageModel>> {
        let cached = self.store()?.get_image(name)?;
        Ok(cached.filter(ImageModel::is_downloaded))
    }
}
