//! Thumbnail download for the preview message.
//!
//! The thumbnail is fetched once per submitted link, stored under the temp
//! directory with a random name, and sent either as a photo or, when it is
//! too large for a photo, as a plain document.

use crate::core::error::AppError;
use crate::retrieval::ArtifactGuard;
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// How the preview image is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailShape {
    /// Sent as a photo
    Image,
    /// Sent as a generic file
    Document,
}

impl ThumbnailShape {
    /// Files strictly below the threshold are images; anything at or above is a document.
    pub fn for_size(size_bytes: u64, document_threshold_bytes: u64) -> Self {
        if size_bytes >= document_threshold_bytes {
            ThumbnailShape::Document
        } else {
            ThumbnailShape::Image
        }
    }
}

/// A downloaded thumbnail and the way it should be sent
#[derive(Debug)]
pub struct Thumbnail {
    pub artifact: ArtifactGuard,
    pub shape: ThumbnailShape,
}

/// Downloads thumbnails over HTTP.
#[derive(Clone)]
pub struct ThumbnailFetcher {
    client: reqwest::Client,
    document_threshold_bytes: u64,
}

impl ThumbnailFetcher {
    pub fn new(timeout: Duration, document_threshold_bytes: u64) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            document_threshold_bytes,
        })
    }

    /// Streams `url` into `dir/<uuid>.jpg`.
    ///
    /// # Errors
    ///
    /// `AppError::ThumbnailFetch` for non-2xx responses; `Http`/`Io` for transport
    /// and disk failures. No file is left behind on error.
    pub async fn fetch(&self, url: &str, dir: &Path) -> Result<Thumbnail, AppError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            log::warn!("Thumbnail request {} returned {}", url, response.status());
            return Err(AppError::ThumbnailFetch(response.status()));
        }

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.jpg", uuid::Uuid::new_v4()));

        // Owned before the first byte lands; an abandoned stream drops the guard.
        let mut artifact = ArtifactGuard::claim(path);
        write_body(response, artifact.path()).await?;
        artifact.refresh_size().await?;

        let shape = ThumbnailShape::for_size(artifact.size_bytes(), self.document_threshold_bytes);
        log::debug!(
            "Thumbnail saved to {} ({} bytes, {:?})",
            artifact.path().display(),
            artifact.size_bytes(),
            shape
        );

        Ok(Thumbnail { artifact, shape })
    }
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<(), AppError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
