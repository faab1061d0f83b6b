//! Media catalog: what a source URL offers before anything is downloaded.
//!
//! A `MediaCatalogProvider` turns a URL into `MediaMetadata` with an ordered
//! list of candidate encodings. The yt-dlp binding lives in `crate::ytdlp`;
//! tests plug in their own providers.

pub mod selector;

use crate::core::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

pub use selector::CandidateSelector;

/// One downloadable encoding offered by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Opaque identifier understood by the retrieval adapter
    pub id: String,
    /// Human-readable resolution, e.g. "1920x1080" or "720p"
    pub resolution_label: String,
    /// Estimated size in MB, one decimal place; absent when the source does not say
    pub size_estimate_mb: Option<f64>,
    /// Quality rank supplied by the provider; higher is larger/better
    pub rank: u64,
}

impl Candidate {
    pub fn new(id: impl Into<String>, resolution_label: impl Into<String>, size_estimate_mb: Option<f64>, rank: u64) -> Self {
        Self {
            id: id.into(),
            resolution_label: resolution_label.into(),
            size_estimate_mb,
            rank,
        }
    }
}

/// Everything the catalog knows about a source URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaMetadata {
    pub title: String,
    pub author: String,
    pub duration_seconds: u64,
    pub thumbnail_url: Option<String>,
    pub candidates: Vec<Candidate>,
}

/// Source of media metadata.
///
/// Implementations must not cache: every call reflects the source as it is now.
#[async_trait]
pub trait MediaCatalogProvider: Send + Sync {
    /// Human-readable name of this provider (e.g., "yt-dlp")
    fn name(&self) -> &str;

    /// Fetch metadata and candidate encodings for the URL.
    ///
    /// # Errors
    ///
    /// `AppError::Extraction` when the source is unreachable or invalid.
    async fn fetch_metadata(&self, url: &Url) -> Result<MediaMetadata, AppError>;
}

/// Fetches the same URL twice and reports candidate ids that differ between the calls.
///
/// The pipeline assumes a stable catalog between presentation and delivery; this
/// is the check used to flag providers that violate that.
pub async fn candidate_id_drift(provider: &dyn MediaCatalogProvider, url: &Url) -> Result<Vec<String>, AppError> {
    let first = provider.fetch_metadata(url).await?;
    let second = provider.fetch_metadata(url).await?;

    let ids = |meta: &MediaMetadata| meta.candidates.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
    let (first_ids, second_ids) = (ids(&first), ids(&second));

    let mut drift: Vec<String> = first_ids
        .iter()
        .filter(|id| !second_ids.contains(id))
        .chain(second_ids.iter().filter(|id| !first_ids.contains(id)))
        .cloned()
        .collect();
    if drift.is_empty() && first_ids != second_ids {
        // Same set, different order
        drift = second_ids;
    }

    if !drift.is_empty() {
        log::warn!("Catalog '{}' returned unstable candidates for {}: {:?}", provider.name(), url, drift);
    }
    Ok(drift)
}
