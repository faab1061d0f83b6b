//! Catalog provider returning scripted metadata

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tubecore::{AppError, Candidate, MediaCatalogProvider, MediaMetadata};
use url::Url;

/// Answers every lookup with the same metadata, unless responses were queued.
pub struct MockCatalog {
    metadata: MediaMetadata,
    queued: Mutex<VecDeque<Result<MediaMetadata, String>>>,
    calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new(metadata: MediaMetadata) -> Self {
        Self {
            metadata,
            queued: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Catalog with the given candidates and no thumbnail
    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self::new(metadata("Test Clip", "Test Channel", 185, candidates))
    }

    /// Next lookup returns `response` instead of the default metadata.
    pub fn queue(&self, response: Result<MediaMetadata, String>) {
        self.queued.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn metadata(title: &str, author: &str, duration_seconds: u64, candidates: Vec<Candidate>) -> MediaMetadata {
    MediaMetadata {
        title: title.to_string(),
        author: author.to_string(),
        duration_seconds,
        thumbnail_url: None,
        candidates,
    }
}

#[async_trait]
impl MediaCatalogProvider for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_metadata(&self, _url: &Url) -> Result<MediaMetadata, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.queued.lock().unwrap().pop_front();
        match queued {
            Some(Ok(metadata)) => Ok(metadata),
            Some(Err(message)) => Err(AppError::Extraction(message)),
            None => Ok(self.metadata.clone()),
        }
    }
}
