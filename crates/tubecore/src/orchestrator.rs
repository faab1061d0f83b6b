//! Download orchestration: present formats, then fetch the chosen one,
//! stepping down to smaller candidates while the result is over the size
//! ceiling.
//!
//! Session lifecycle per identity:
//!
//! ```text
//! Idle --present--> Selecting --select--> Retrieving --+--> Succeeded (session removed)
//!                                             ^        |
//!                                             +--------+ oversize, smaller candidate left
//!                                                      +--> Failed (session removed)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::catalog::{Candidate, CandidateSelector, MediaCatalogProvider, MediaMetadata};
use crate::core::config::PipelineSettings;
use crate::core::error::AppError;
use crate::core::utils::sanitize_filename;
use crate::gateway::SelectionChoice;
use crate::retrieval::{remove_partial_files, ArtifactGuard, RetrievalAdapter};
use crate::session::{IdentityId, Session, SessionStore, SessionSummary};
use crate::thumbnail::{Thumbnail, ThumbnailFetcher};

/// Result of a link submission
#[derive(Debug)]
pub struct Presentation {
    pub source_url: Url,
    pub metadata: MediaMetadata,
    /// Deduplicated, ordered candidates shown as buttons
    pub candidates: Vec<Candidate>,
    pub thumbnail: Option<Thumbnail>,
    /// Generation of the session opened for this presentation
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    Audio,
    Video,
}

/// Output of the retrieval loop. Dropping it deletes the file.
#[derive(Debug)]
pub struct Retrieved {
    pub kind: DeliveryKind,
    pub artifact: ArtifactGuard,
    /// Candidate that was delivered (video only)
    pub candidate: Option<Candidate>,
    /// Retrieval attempts it took
    pub attempts: usize,
}

/// A downloaded file ready to be sent, with what the caption needs.
#[derive(Debug)]
pub struct Delivery {
    pub kind: DeliveryKind,
    pub artifact: ArtifactGuard,
    pub candidate: Option<Candidate>,
    pub attempts: usize,
    pub source_url: Url,
    pub summary: SessionSummary,
}

/// Drives the select → retrieve → size-check → fallback loop.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    catalog: Arc<dyn MediaCatalogProvider>,
    retriever: Arc<dyn RetrievalAdapter>,
    thumbnails: ThumbnailFetcher,
    sessions: SessionStore,
    settings: PipelineSettings,
    shutdown: CancellationToken,
}

impl DownloadOrchestrator {
    pub fn new(
        catalog: Arc<dyn MediaCatalogProvider>,
        retriever: Arc<dyn RetrievalAdapter>,
        settings: PipelineSettings,
    ) -> Result<Self, AppError> {
        let thumbnails = ThumbnailFetcher::new(settings.thumbnail_timeout, settings.thumbnail_document_threshold_bytes)?;
        Ok(Self {
            catalog,
            retriever,
            thumbnails,
            sessions: SessionStore::new(),
            settings,
            shutdown: CancellationToken::new(),
        })
    }

    /// Uses an existing session store instead of a private one.
    #[must_use]
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    /// Cancels in-flight collaborator calls when `token` fires.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Looks up a link, opens a `Selecting` session and fetches the thumbnail.
    ///
    /// The thumbnail is fetched before the session is stored, so a failed
    /// presentation never leaves a session behind.
    pub async fn present(&self, identity: IdentityId, url: Url) -> Result<Presentation, AppError> {
        log::info!("Presenting formats for {:?}: {}", identity, url);

        let (metadata, candidates) = self.list_formats(&url).await?;

        let thumbnail = match metadata.thumbnail_url.as_deref() {
            Some(thumb_url) => Some(
                self.guarded(
                    "thumbnail fetch",
                    self.settings.thumbnail_timeout,
                    self.thumbnails.fetch(thumb_url, &self.settings.temp_dir),
                )
                .await?,
            ),
            None => None,
        };

        let summary = summary_of(&metadata);
        let generation = self
            .sessions
            .open(identity, url.clone(), candidates.clone(), summary)
            .await;
        log::debug!("{:?}: Idle -> Selecting (generation {})", identity, generation);

        Ok(Presentation {
            source_url: url,
            metadata,
            candidates,
            thumbnail,
            generation,
        })
    }

    /// Fetches metadata and builds the presentation list without opening a session.
    pub async fn list_formats(&self, url: &Url) -> Result<(MediaMetadata, Vec<Candidate>), AppError> {
        let metadata = self.fetch_metadata(url).await?;
        let candidates = CandidateSelector::build_presentation_list(&metadata.candidates);
        log::info!(
            "'{}': {} raw candidates, {} presented",
            metadata.title,
            metadata.candidates.len(),
            candidates.len()
        );
        Ok((metadata, candidates))
    }

    /// Drops a session opened by `present` (e.g. when the preview could not be sent).
    pub async fn discard(&self, identity: IdentityId, generation: u64) {
        if self.sessions.close(identity, generation).await {
            log::debug!("{:?}: session {} discarded", identity, generation);
        }
    }

    /// Resolves the user's choice for their current session.
    ///
    /// The session is removed afterwards whatever the outcome.
    pub async fn select(&self, identity: IdentityId, choice: &SelectionChoice) -> Result<Delivery, AppError> {
        let session = self.claim(identity).await?;
        self.select_claimed(identity, session, choice).await
    }

    /// Moves the identity's session to `Retrieving` without downloading yet.
    ///
    /// Lets the caller announce the download only once it is known to be the
    /// one that will run. Follow with [`Self::select_claimed`].
    ///
    /// # Errors
    ///
    /// `SessionNotFound` or `AlreadyInProgress`.
    pub async fn claim(&self, identity: IdentityId) -> Result<Session, AppError> {
        let session = self.sessions.begin_retrieval(identity).await?;
        log::debug!("{:?}: Selecting -> Retrieving", identity);
        Ok(session)
    }

    /// Runs the retrieval for a session obtained from [`Self::claim`] and
    /// closes it whatever the outcome.
    pub async fn select_claimed(
        &self,
        identity: IdentityId,
        session: Session,
        choice: &SelectionChoice,
    ) -> Result<Delivery, AppError> {
        log::debug!("{:?}: retrieving {:?}", identity, choice);
        let label_prefix = format!("{}_{}", identity.0, session.generation);
        let result = self
            .retrieve(&session.source_url, &session.candidates, choice, &label_prefix)
            .await
            .map(|retrieved| Delivery {
                kind: retrieved.kind,
                artifact: retrieved.artifact,
                candidate: retrieved.candidate,
                attempts: retrieved.attempts,
                source_url: session.source_url.clone(),
                summary: session.summary.clone(),
            });

        self.sessions.close(identity, session.generation).await;
        match &result {
            Ok(delivery) => log::info!(
                "{:?}: Retrieving -> Succeeded ({} bytes after {} attempt(s))",
                identity,
                delivery.artifact.size_bytes(),
                delivery.attempts
            ),
            Err(e) => log::warn!("{:?}: Retrieving -> Failed [{}]: {}", identity, e.kind(), e),
        }
        result
    }

    /// Runs a choice against a candidate list without touching sessions.
    ///
    /// Audio is a single attempt. Video starts at the chosen id and walks down
    /// the list while the downloaded file is larger than the ceiling, for at
    /// most `min(list length, max_attempts)` attempts.
    pub async fn retrieve(
        &self,
        url: &Url,
        candidates: &[Candidate],
        choice: &SelectionChoice,
        label_prefix: &str,
    ) -> Result<Retrieved, AppError> {
        match choice {
            SelectionChoice::AudioOnly => {
                let label = unique_label("audio", label_prefix);
                let path = self
                    .guarded_retrieval(&label, self.retriever.retrieve_best_audio(url, &label))
                    .await?;
                let artifact = ArtifactGuard::adopt(path).await?;
                Ok(Retrieved {
                    kind: DeliveryKind::Audio,
                    artifact,
                    candidate: None,
                    attempts: 1,
                })
            }
            SelectionChoice::Format(id) => {
                let (artifact, candidate, attempts) = self.retrieve_video(url, candidates, id, label_prefix).await?;
                Ok(Retrieved {
                    kind: DeliveryKind::Video,
                    artifact,
                    candidate: Some(candidate),
                    attempts,
                })
            }
        }
    }

    async fn retrieve_video(
        &self,
        url: &Url,
        candidates: &[Candidate],
        chosen_id: &str,
        label_prefix: &str,
    ) -> Result<(ArtifactGuard, Candidate, usize), AppError> {
        let ceiling = self.settings.max_video_size_bytes;
        let max_attempts = candidates.len().clamp(1, self.settings.max_attempts.max(1));

        let mut current = candidates
            .iter()
            .find(|c| c.id == chosen_id)
            .cloned()
            .unwrap_or_else(|| {
                log::warn!("Chosen format {} is not in the presented list", chosen_id);
                Candidate::new(chosen_id, "unknown", None, 0)
            });
        let mut attempts = 0;

        loop {
            attempts += 1;
            let label = unique_label("video", label_prefix);
            log::info!(
                "Attempt {}/{}: format {} ({})",
                attempts,
                max_attempts,
                current.id,
                current.resolution_label
            );

            let path = self
                .guarded_retrieval(&label, self.retriever.retrieve_video(url, &current.id, &label))
                .await?;
            let artifact = ArtifactGuard::adopt(path).await?;

            if artifact.size_bytes() <= ceiling {
                return Ok((artifact, current, attempts));
            }

            log::info!(
                "Format {} is {} bytes, over the {} byte limit; discarding",
                current.id,
                artifact.size_bytes(),
                ceiling
            );
            drop(artifact);

            let next = CandidateSelector::next_smaller(&current.id, candidates)
                .cloned()
                .ok_or(AppError::ExhaustedCandidates)?;
            if attempts >= max_attempts {
                log::warn!("Giving up after {} attempts with candidates left", attempts);
                return Err(AppError::ExhaustedCandidates);
            }
            current = next;
        }
    }

    /// Re-fetches metadata for the delivery caption.
    ///
    /// Metadata is never cached, so the caption reflects the source at delivery
    /// time. A failed lookup falls back to what was captured at presentation.
    pub async fn refresh_summary(&self, delivery: &Delivery) -> SessionSummary {
        match self.fetch_metadata(&delivery.source_url).await {
            Ok(metadata) => summary_of(&metadata),
            Err(e) => {
                log::warn!("Caption metadata refresh failed, using presentation data: {}", e);
                delivery.summary.clone()
            }
        }
    }

    async fn fetch_metadata(&self, url: &Url) -> Result<MediaMetadata, AppError> {
        self.guarded(
            "metadata fetch",
            self.settings.metadata_timeout,
            self.catalog.fetch_metadata(url),
        )
        .await
    }

    /// Retrieval with deadline; fragments are swept if the call was abandoned.
    async fn guarded_retrieval<F>(&self, label: &str, fut: F) -> Result<std::path::PathBuf, AppError>
    where
        F: Future<Output = Result<std::path::PathBuf, AppError>>,
    {
        let result = self.guarded("retrieval", self.settings.retrieval_timeout, fut).await;
        if matches!(result, Err(AppError::Timeout { .. } | AppError::Cancelled)) {
            let removed = remove_partial_files(&self.settings.download_folder, &sanitize_filename(label)).await;
            log::debug!("Swept {} partial file(s) for {}", removed, label);
        }
        result
    }

    async fn guarded<T, F>(&self, operation: &'static str, limit: Duration, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(AppError::Cancelled),
            result = tokio::time::timeout(limit, fut) => match result {
                Ok(inner) => inner,
                Err(_) => {
                    log::error!("{} timed out after {}s", operation, limit.as_secs());
                    Err(AppError::Timeout { operation, after: limit })
                }
            },
        }
    }
}

fn summary_of(metadata: &MediaMetadata) -> SessionSummary {
    SessionSummary {
        title: metadata.title.clone(),
        author: metadata.author.clone(),
        duration_seconds: metadata.duration_seconds,
    }
}

fn unique_label(kind: &str, prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", kind, prefix, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const MIB: u64 = 1024 * 1024;

    struct FixedCatalog {
        metadata: MediaMetadata,
    }

    #[async_trait]
    impl MediaCatalogProvider for FixedCatalog {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_metadata(&self, _url: &Url) -> Result<MediaMetadata, AppError> {
            Ok(self.metadata.clone())
        }
    }

    /// Writes sparse files of a preset size per format id and records every call.
    struct SizedRetriever {
        dir: PathBuf,
        sizes: HashMap<String, u64>,
        audio: Option<u64>,
        calls: Mutex<Vec<String>>,
    }

    impl SizedRetriever {
        fn write(&self, label: &str, size: u64) -> Result<PathBuf, AppError> {
            let path = self.dir.join(format!("{}.bin", sanitize_filename(label)));
            let file = std::fs::File::create(&path)?;
            file.set_len(size)?;
            Ok(path)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RetrievalAdapter for SizedRetriever {
        fn name(&self) -> &str {
            "sized"
        }

        async fn retrieve_video(&self, _url: &Url, candidate_id: &str, label: &str) -> Result<PathBuf, AppError> {
            self.calls.lock().unwrap().push(candidate_id.to_string());
            match self.sizes.get(candidate_id) {
                Some(size) => self.write(label, *size),
                None => Err(AppError::Retrieval(format!("format {} unavailable", candidate_id))),
            }
        }

        async fn retrieve_best_audio(&self, _url: &Url, label: &str) -> Result<PathBuf, AppError> {
            self.calls.lock().unwrap().push("audio".to_string());
            match self.audio {
                Some(size) => self.write(label, size),
                None => Err(AppError::Retrieval("audio extraction failed".to_string())),
            }
        }
    }

    fn scenario_a_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("137", "1080p", Some(80.0), 1080),
            Candidate::new("136", "720p", Some(45.0), 720),
            Candidate::new("135", "480p", Some(20.0), 480),
        ]
    }

    fn metadata(candidates: Vec<Candidate>) -> MediaMetadata {
        MediaMetadata {
            title: "Clip".to_string(),
            author: "Channel".to_string(),
            duration_seconds: 95,
            thumbnail_url: None,
            candidates,
        }
    }

    fn setup(sizes: &[(&str, u64)], audio: Option<u64>) -> (DownloadOrchestrator, Arc<SizedRetriever>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let retriever = Arc::new(SizedRetriever {
            dir: dir.path().to_path_buf(),
            sizes: sizes.iter().map(|(id, s)| (id.to_string(), *s)).collect(),
            audio,
            calls: Mutex::new(Vec::new()),
        });
        let settings = PipelineSettings {
            download_folder: dir.path().to_path_buf(),
            temp_dir: dir.path().join("thumbs"),
            ..PipelineSettings::default()
        };
        let catalog = Arc::new(FixedCatalog {
            metadata: metadata(scenario_a_candidates()),
        });
        let orchestrator = DownloadOrchestrator::new(catalog, retriever.clone(), settings).unwrap();
        (orchestrator, retriever, dir)
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| e.as_ref().map(|e| e.path().is_file()).unwrap_or(false))
            .count()
    }

    fn url() -> Url {
        Url::parse("https://www.youtube.com/watch?v=abc").unwrap()
    }

    #[tokio::test]
    async fn test_oversize_falls_back_to_next_candidate() {
        let (orchestrator, retriever, dir) = setup(&[("137", 80 * MIB), ("136", 45 * MIB), ("135", 20 * MIB)], None);
        let id = IdentityId(1);

        orchestrator.present(id, url()).await.unwrap();
        let delivery = orchestrator
            .select(id, &SelectionChoice::Format("137".to_string()))
            .await
            .unwrap();

        assert_eq!(delivery.kind, DeliveryKind::Video);
        assert_eq!(delivery.candidate.as_ref().map(|c| c.id.as_str()), Some("136"));
        assert_eq!(delivery.attempts, 2);
        assert_eq!(delivery.artifact.size_bytes(), 45 * MIB);
        assert_eq!(retriever.calls(), vec!["137", "136"]);
        // Only the delivered file is on disk; the 80 MB one is gone
        assert_eq!(files_in(dir.path()), 1);
        assert!(!orchestrator.sessions().contains(id).await);

        drop(delivery);
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_last_candidate_oversize_exhausts_list() {
        let (orchestrator, retriever, dir) = setup(&[("137", 90 * MIB), ("136", 70 * MIB), ("135", 51 * MIB)], None);
        let id = IdentityId(2);

        orchestrator.present(id, url()).await.unwrap();
        let result = orchestrator.select(id, &SelectionChoice::Format("137".to_string())).await;

        assert!(matches!(result, Err(AppError::ExhaustedCandidates)));
        assert_eq!(retriever.calls().len(), 3);
        assert_eq!(files_in(dir.path()), 0);
        assert!(!orchestrator.sessions().contains(id).await);
    }

    #[tokio::test]
    async fn test_audio_failure_is_terminal() {
        let (orchestrator, retriever, dir) = setup(&[("137", MIB)], None);
        let id = IdentityId(3);

        orchestrator.present(id, url()).await.unwrap();
        let result = orchestrator.select(id, &SelectionChoice::AudioOnly).await;

        assert!(matches!(result, Err(AppError::Retrieval(_))));
        assert_eq!(retriever.calls(), vec!["audio"]);
        assert_eq!(files_in(dir.path()), 0);
        assert!(!orchestrator.sessions().contains(id).await);
    }

    #[tokio::test]
    async fn test_audio_is_not_size_checked() {
        let (orchestrator, _retriever, _dir) = setup(&[], Some(60 * MIB));
        let id = IdentityId(4);

        orchestrator.present(id, url()).await.unwrap();
        let delivery = orchestrator.select(id, &SelectionChoice::AudioOnly).await.unwrap();
        assert_eq!(delivery.kind, DeliveryKind::Audio);
        assert_eq!(delivery.attempts, 1);
        assert!(delivery.candidate.is_none());
    }

    #[tokio::test]
    async fn test_retrieval_error_does_not_fall_back() {
        // 137 is missing from the adapter's table, so the first attempt fails outright
        let (orchestrator, retriever, _dir) = setup(&[("136", MIB)], None);
        let id = IdentityId(5);

        orchestrator.present(id, url()).await.unwrap();
        let result = orchestrator.select(id, &SelectionChoice::Format("137".to_string())).await;

        assert!(matches!(result, Err(AppError::Retrieval(_))));
        assert_eq!(retriever.calls(), vec!["137"]);
    }

    #[tokio::test]
    async fn test_select_without_session() {
        let (orchestrator, retriever, _dir) = setup(&[("137", MIB)], None);
        let result = orchestrator.select(IdentityId(6), &SelectionChoice::AudioOnly).await;
        assert!(matches!(result, Err(AppError::SessionNotFound)));
        assert!(retriever.calls().is_empty());
    }

    #[tokio::test]
    async fn test_attempt_cap_bounds_the_loop() {
        let (orchestrator, retriever, _dir) = setup(&[("137", 90 * MIB), ("136", 70 * MIB), ("135", MIB)], None);
        let orchestrator = DownloadOrchestrator {
            settings: PipelineSettings {
                max_attempts: 2,
                ..orchestrator.settings.clone()
            },
            ..orchestrator
        };

        let result = orchestrator
            .retrieve(&url(), &scenario_a_candidates(), &SelectionChoice::Format("137".to_string()), "t")
            .await;

        assert!(matches!(result, Err(AppError::ExhaustedCandidates)));
        assert_eq!(retriever.calls(), vec!["137", "136"]);
    }

    #[tokio::test]
    async fn test_unknown_choice_gets_one_attempt() {
        let (orchestrator, retriever, _dir) = setup(&[("999", 90 * MIB)], None);
        let result = orchestrator
            .retrieve(&url(), &scenario_a_candidates(), &SelectionChoice::Format("999".to_string()), "t")
            .await;

        assert!(matches!(result, Err(AppError::ExhaustedCandidates)));
        assert_eq!(retriever.calls(), vec!["999"]);
    }

    struct StalledCatalog;

    #[async_trait]
    impl MediaCatalogProvider for StalledCatalog {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn fetch_metadata(&self, _url: &Url) -> Result<MediaMetadata, AppError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AppError::Extraction("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_metadata_timeout() {
        let (_, retriever, dir) = setup(&[], None);
        let settings = PipelineSettings {
            metadata_timeout: Duration::from_millis(20),
            download_folder: dir.path().to_path_buf(),
            ..PipelineSettings::default()
        };
        let orchestrator = DownloadOrchestrator::new(Arc::new(StalledCatalog), retriever, settings).unwrap();

        let result = orchestrator.present(IdentityId(8), url()).await;
        assert!(matches!(result, Err(AppError::Timeout { operation: "metadata fetch", .. })));
        assert!(orchestrator.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_calls() {
        let (_, retriever, _dir) = setup(&[], None);
        let token = CancellationToken::new();
        let orchestrator = DownloadOrchestrator::new(Arc::new(StalledCatalog), retriever, PipelineSettings::default())
            .unwrap()
            .with_shutdown(token.clone());

        token.cancel();
        let result = orchestrator.present(IdentityId(9), url()).await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    /// Leaves a fragment named after the label, then hangs like a stuck extractor.
    struct HangingRetriever {
        dir: PathBuf,
    }

    #[async_trait]
    impl RetrievalAdapter for HangingRetriever {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn retrieve_video(&self, _url: &Url, _candidate_id: &str, label: &str) -> Result<PathBuf, AppError> {
            std::fs::write(self.dir.join(format!("{}.mp4.part", sanitize_filename(label))), b"partial")?;
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AppError::Retrieval("unreachable".to_string()))
        }

        async fn retrieve_best_audio(&self, url: &Url, label: &str) -> Result<PathBuf, AppError> {
            self.retrieve_video(url, "audio", label).await
        }
    }

    fn hanging_orchestrator(dir: &TempDir, retrieval_timeout: Duration) -> DownloadOrchestrator {
        let settings = PipelineSettings {
            retrieval_timeout,
            download_folder: dir.path().to_path_buf(),
            temp_dir: dir.path().join("thumbs"),
            ..PipelineSettings::default()
        };
        let catalog = Arc::new(FixedCatalog {
            metadata: metadata(scenario_a_candidates()),
        });
        let retriever = Arc::new(HangingRetriever {
            dir: dir.path().to_path_buf(),
        });
        DownloadOrchestrator::new(catalog, retriever, settings).unwrap()
    }

    #[tokio::test]
    async fn test_retrieval_timeout_sweeps_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = hanging_orchestrator(&dir, Duration::from_millis(100));
        let id = IdentityId(10);

        orchestrator.present(id, url()).await.unwrap();
        let result = orchestrator.select(id, &SelectionChoice::Format("137".to_string())).await;

        assert!(matches!(result, Err(AppError::Timeout { operation: "retrieval", .. })));
        assert_eq!(files_in(dir.path()), 0);
        assert!(!orchestrator.sessions().contains(id).await);
    }

    #[tokio::test]
    async fn test_shutdown_during_retrieval_sweeps_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let orchestrator = hanging_orchestrator(&dir, Duration::from_secs(3600)).with_shutdown(token.clone());
        let id = IdentityId(11);

        orchestrator.present(id, url()).await.unwrap();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });
        let result = orchestrator.select(id, &SelectionChoice::AudioOnly).await;

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert_eq!(files_in(dir.path()), 0);
        assert!(!orchestrator.sessions().contains(id).await);
    }

    #[test]
    fn test_unique_label_shape() {
        let a = unique_label("video", "1_2");
        let b = unique_label("video", "1_2");
        assert!(a.starts_with("video_1_2_"));
        assert_ne!(a, b);
    }
}
