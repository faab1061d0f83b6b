//! Retrieval adapter that writes sparse files of scripted sizes

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tubecore::core::utils::sanitize_filename;
use tubecore::{AppError, RetrievalAdapter};
use url::Url;

/// What an attempt for one target produces
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A file of this many bytes
    File(u64),
    /// A retrieval error with this message
    Fail(String),
}

pub struct MockRetriever {
    dir: PathBuf,
    videos: HashMap<String, Outcome>,
    audio: Outcome,
    calls: Mutex<Vec<String>>,
}

impl MockRetriever {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            videos: HashMap::new(),
            audio: Outcome::File(4 * 1024 * 1024),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn video(mut self, id: &str, size_bytes: u64) -> Self {
        self.videos.insert(id.to_string(), Outcome::File(size_bytes));
        self
    }

    #[must_use]
    pub fn failing_video(mut self, id: &str, message: &str) -> Self {
        self.videos.insert(id.to_string(), Outcome::Fail(message.to_string()));
        self
    }

    #[must_use]
    pub fn audio(mut self, outcome: Outcome) -> Self {
        self.audio = outcome;
        self
    }

    /// Targets requested so far, in order (`"audio"` for audio attempts)
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn produce(&self, outcome: &Outcome, label: &str) -> Result<PathBuf, AppError> {
        match outcome {
            Outcome::File(size) => {
                let path = self.dir.join(format!("{}.mp4", sanitize_filename(label)));
                let file = std::fs::File::create(&path)?;
                file.set_len(*size)?;
                Ok(path)
            }
            Outcome::Fail(message) => Err(AppError::Retrieval(message.clone())),
        }
    }
}

#[async_trait]
impl RetrievalAdapter for MockRetriever {
    fn name(&self) -> &str {
        "mock"
    }

    async fn retrieve_video(&self, _url: &Url, candidate_id: &str, label: &str) -> Result<PathBuf, AppError> {
        self.calls.lock().unwrap().push(candidate_id.to_string());
        let outcome = self
            .videos
            .get(candidate_id)
            .cloned()
            .unwrap_or_else(|| Outcome::Fail(format!("Requested format {} is not available", candidate_id)));
        self.produce(&outcome, label)
    }

    async fn retrieve_best_audio(&self, _url: &Url, label: &str) -> Result<PathBuf, AppError> {
        self.calls.lock().unwrap().push("audio".to_string());
        self.produce(&self.audio, label)
    }
}
