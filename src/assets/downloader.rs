use crate::model::ImageModel;
use crate::source::send_get;
use crate::{AssetError, NetworkError};
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Downloads a binary asset and reports where it was written
#[async_trait]
pub trait AssetDownloader: Send + Sync {
    /// Downloads `url`
    ///
    /// The returned image has `name` set to the requested URL, `url` set to
    /// the final URL after redirects and `local_path` set.
    async fn download(&self, url: &str) -> Result<ImageModel, AssetError>;
}

/// Computes where the asset for `url` is stored under `root`
///
/// Files are sharded by the first byte of the SHA-256 of the URL:
/// `<root>/<2 hex>/<64 hex>.<ext>`.
pub fn asset_path(root: &Path, url: &Url) -> PathBuf {
    let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));

    let extension = Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "bin".to_string());

    root.join(&digest[..2]).join(format!("{}.{}", digest, extension))
}

/// Downloads assets over HTTP into a local directory
pub struct HttpAssetDownloader {
    client: Client,
    root: PathBuf,
}

impl HttpAssetDownloader {
    pub fn new(client: Client, root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }
}

#[async_trait]
impl AssetDownloader for HttpAssetDownloader {
    async fn download(&self, url: &str) -> Result<ImageModel, AssetError> {
        let parsed = Url::parse(url).map_err(|_| AssetError::InvalidUrl(url.to_string()))?;

        let response = send_get(&self.client, parsed.as_str())
            .await
            .map_err(|source| AssetError::Download {
                url: url.to_string(),
                source,
            })?;
        let final_url = response.url().to_string();

        let bytes = response.bytes().await.map_err(|e| AssetError::Download {
            url: url.to_string(),
            source: NetworkError::Http {
                url: url.to_string(),
                source: e,
            },
        })?;

        let path = asset_path(&self.root, &parsed);
        let io_error = |source: std::io::Error| AssetError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, &bytes).await.map_err(io_error)?;

        tracing::debug!("Downloaded {} ({} bytes) to {}", url, bytes.len(), path.display());

        let mut image = ImageModel::new(url);
        image.url = final_url;
        image.local_path = Some(path);
        Ok(image)
    }
}
