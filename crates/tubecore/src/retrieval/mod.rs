//! Retrieval: turning a chosen candidate into a local file.
//!
//! `RetrievalAdapter` is the seam to the extractor; `ArtifactGuard` owns the
//! resulting file and deletes it when dropped, so every exit path of the
//! pipeline (success, oversize fallback, failure) cleans up after itself.

use crate::core::error::AppError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

/// Downloads media for a source URL into a working directory.
///
/// Both methods write a file whose name is derived from `label` (sanitized)
/// and return its path. On failure the adapter removes any partial output
/// before returning.
#[async_trait]
pub trait RetrievalAdapter: Send + Sync {
    /// Human-readable name of this adapter (e.g., "yt-dlp")
    fn name(&self) -> &str;

    /// Download the video encoding identified by `candidate_id`.
    async fn retrieve_video(&self, url: &Url, candidate_id: &str, label: &str) -> Result<PathBuf, AppError>;

    /// Download the best available audio, transcoded to the configured container.
    async fn retrieve_best_audio(&self, url: &Url, label: &str) -> Result<PathBuf, AppError>;
}

/// Removes every file in `dir` whose name starts with `stem`.
///
/// Used after a retrieval was abandoned mid-flight (timeout or shutdown), when
/// the extractor may have left fragments such as `stem.mp4.part` behind.
pub async fn remove_partial_files(dir: &Path, stem: &str) -> usize {
    let mut removed = 0;
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let matches = entry.file_name().to_str().is_some_and(|name| name.starts_with(stem));
        if matches && tokio::fs::remove_file(entry.path()).await.is_ok() {
            log::debug!("Removed partial file {}", entry.path().display());
            removed += 1;
        }
    }
    removed
}

/// A local file exclusively owned by one in-flight operation.
///
/// Dropping the guard deletes the file. Call [`ArtifactGuard::persist`] to
/// move it somewhere permanent instead.
#[derive(Debug)]
pub struct ArtifactGuard {
    path: Option<PathBuf>,
    size_bytes: u64,
}

impl ArtifactGuard {
    /// Takes ownership of an existing file and records its size.
    ///
    /// If the file cannot be inspected it is removed and the error returned.
    pub async fn adopt(path: PathBuf) -> Result<Self, AppError> {
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Self {
                path: Some(path),
                size_bytes: meta.len(),
            }),
            Ok(_) => Err(AppError::Retrieval(format!("{} is not a file", path.display()))),
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(AppError::Io(e))
            }
        }
    }

    /// Claims `path` before anything is written there, so a writer that is
    /// abandoned mid-stream still leaves nothing behind.
    pub fn claim(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            size_bytes: 0,
        }
    }

    /// Re-reads the size once the owner has finished writing.
    pub async fn refresh_size(&mut self) -> Result<u64, AppError> {
        let meta = tokio::fs::metadata(self.path()).await?;
        self.size_bytes = meta.len();
        Ok(self.size_bytes)
    }

    pub fn path(&self) -> &Path {
        // Only `persist` clears the path, and it consumes the guard.
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Moves the file into `dir` and releases ownership of it.
    pub async fn persist(mut self, dir: &Path) -> Result<PathBuf, AppError> {
        let Some(source) = self.path.take() else {
            return Err(AppError::Retrieval("artifact already released".to_string()));
        };
        let file_name = source.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        let target = dir.join(file_name);

        tokio::fs::create_dir_all(dir).await?;
        if let Err(e) = tokio::fs::rename(&source, &target).await {
            // Cross-device moves need a copy; put the path back so Drop cleans up.
            log::debug!("rename {} failed ({}), copying instead", source.display(), e);
            let copied = tokio::fs::copy(&source, &target).await;
            self.path = Some(source);
            copied?;
        }
        Ok(target)
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed artifact {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove artifact {}: {}", path.display(), e),
            }
        }
    }
}
