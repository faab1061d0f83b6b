//! yt-dlp bindings: catalog provider and retrieval adapter.
//!
//! Both shell out to the `yt-dlp` binary through `tokio::process`. Children are
//! spawned with `kill_on_drop`, so a caller that gives up on the future (timeout
//! or shutdown) also stops the process.

pub mod errors;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

use crate::catalog::{Candidate, MediaCatalogProvider, MediaMetadata};
use crate::core::config::PipelineSettings;
use crate::core::error::AppError;
use crate::core::utils::{bytes_to_mb, sanitize_filename};
use crate::retrieval::{remove_partial_files, RetrievalAdapter};
use errors::{analyze_ytdlp_error, get_error_message, last_error_line};

/// Appended to every video format so the result has sound.
pub const AUDIO_MERGE_SUFFIX: &str = "+bestaudio";

#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    format_id: String,
    vcodec: Option<String>,
    resolution: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    width: Option<u64>,
    height: Option<u64>,
}

/// Parses the output of `yt-dlp -J` into metadata.
///
/// Only formats with a video stream become candidates, in the order yt-dlp
/// lists them.
pub fn parse_info_json(json: &str) -> Result<MediaMetadata, AppError> {
    let info: InfoJson =
        serde_json::from_str(json).map_err(|e| AppError::Extraction(format!("Unreadable yt-dlp output: {}", e)))?;

    let candidates = info
        .formats
        .iter()
        .filter(|f| f.vcodec.as_deref() != Some("none"))
        .map(|f| {
            let size_bytes = f.filesize.or(f.filesize_approx).map(|s| s.max(0.0) as u64);
            Candidate::new(
                format!("{}{}", f.format_id, AUDIO_MERGE_SUFFIX),
                f.resolution.clone().unwrap_or_else(|| "video".to_string()),
                size_bytes.map(bytes_to_mb),
                format_rank(f.width, f.height, size_bytes),
            )
        })
        .collect();

    Ok(MediaMetadata {
        title: info.title.unwrap_or_else(|| "Untitled".to_string()),
        author: info
            .uploader
            .or(info.channel)
            .unwrap_or_else(|| "Unknown".to_string()),
        duration_seconds: info.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
        thumbnail_url: info.thumbnail,
        candidates,
    })
}

/// Formats with known dimensions rank above all others.
const DIMENSIONED_RANK_BASE: u64 = 1 << 48;

/// Pixel count offset by [`DIMENSIONED_RANK_BASE`] when the dimensions are
/// known; otherwise the size in KiB, kept below that base.
fn format_rank(width: Option<u64>, height: Option<u64>, size_bytes: Option<u64>) -> u64 {
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => DIMENSIONED_RANK_BASE.saturating_add(w.saturating_mul(h)),
        _ => size_bytes
            .map(|s| (s / 1024).min(DIMENSIONED_RANK_BASE - 1))
            .unwrap_or(0),
    }
}

/// Runs a prepared yt-dlp command and returns its stdout, mapping failures
/// through the stderr classifier.
async fn run_ytdlp(bin: &str, args: &[String], fail: fn(String) -> AppError) -> Result<Vec<u8>, AppError> {
    log::debug!("{} {}", bin, args.join(" "));
    let output = Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            log::error!("Failed to execute {}: {}", bin, e);
            fail(format!("Failed to run {}: {}", bin, e))
        })?;

    if output.status.success() {
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let error_type = analyze_ytdlp_error(&stderr);
    log::error!("yt-dlp failed ({}, {}): {}", output.status, error_type.as_str(), stderr.trim());
    let detail = last_error_line(&stderr).unwrap_or_else(|| get_error_message(error_type));
    Err(fail(format!("{} ({})", get_error_message(error_type), detail)))
}

/// Metadata lookup through `yt-dlp -J`.
#[derive(Debug, Clone)]
pub struct YtDlpCatalog {
    bin: String,
}

impl YtDlpCatalog {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(settings.ytdl_bin.clone())
    }
}

#[async_trait]
impl MediaCatalogProvider for YtDlpCatalog {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch_metadata(&self, url: &Url) -> Result<MediaMetadata, AppError> {
        let args = metadata_args(url);
        let stdout = run_ytdlp(&self.bin, &args, AppError::Extraction).await?;
        let metadata = parse_info_json(&String::from_utf8_lossy(&stdout))?;
        log::info!(
            "Metadata for {}: '{}' by {} ({} formats)",
            url,
            metadata.title,
            metadata.author,
            metadata.candidates.len()
        );
        Ok(metadata)
    }
}

pub fn metadata_args(url: &Url) -> Vec<String> {
    vec![
        "-J".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        url.as_str().to_string(),
    ]
}

/// File retrieval through yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlpRetriever {
    bin: String,
    download_folder: PathBuf,
    video_format: String,
    audio_format: String,
    audio_bitrate_kbps: u32,
}

impl YtDlpRetriever {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            bin: settings.ytdl_bin.clone(),
            download_folder: settings.download_folder.clone(),
            video_format: settings.video_format.clone(),
            audio_format: settings.audio_format.clone(),
            audio_bitrate_kbps: settings.audio_bitrate_kbps,
        }
    }

    fn output_template(&self, stem: &str) -> String {
        self.download_folder
            .join(format!("{}.%(ext)s", stem))
            .to_string_lossy()
            .into_owned()
    }

    pub fn video_args(&self, url: &Url, candidate_id: &str, stem: &str) -> Vec<String> {
        vec![
            "-f".to_string(),
            candidate_id.to_string(),
            "--merge-output-format".to_string(),
            self.video_format.clone(),
            "--no-playlist".to_string(),
            "--no-part".to_string(),
            "-o".to_string(),
            self.output_template(stem),
            url.as_str().to_string(),
        ]
    }

    pub fn audio_args(&self, url: &Url, stem: &str) -> Vec<String> {
        vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            format!("{}K", self.audio_bitrate_kbps),
            "--no-playlist".to_string(),
            "-o".to_string(),
            self.output_template(stem),
            url.as_str().to_string(),
        ]
    }

    async fn run(&self, args: Vec<String>, stem: &str, expected_ext: &str) -> Result<PathBuf, AppError> {
        tokio::fs::create_dir_all(&self.download_folder).await?;

        if let Err(e) = run_ytdlp(&self.bin, &args, AppError::Retrieval).await {
            remove_partial_files(&self.download_folder, stem).await;
            return Err(e);
        }

        match find_output(&self.download_folder, stem, expected_ext).await {
            Some(path) => Ok(path),
            None => {
                remove_partial_files(&self.download_folder, stem).await;
                Err(AppError::Retrieval(format!(
                    "yt-dlp finished but no output file for {} was found",
                    stem
                )))
            }
        }
    }
}

#[async_trait]
impl RetrievalAdapter for YtDlpRetriever {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn retrieve_video(&self, url: &Url, candidate_id: &str, label: &str) -> Result<PathBuf, AppError> {
        let stem = sanitize_filename(label);
        log::info!("Downloading format {} of {} as {}", candidate_id, url, stem);
        let args = self.video_args(url, candidate_id, &stem);
        self.run(args, &stem, &self.video_format).await
    }

    async fn retrieve_best_audio(&self, url: &Url, label: &str) -> Result<PathBuf, AppError> {
        let stem = sanitize_filename(label);
        log::info!("Downloading best audio of {} as {}", url, stem);
        let args = self.audio_args(url, &stem);
        self.run(args, &stem, &self.audio_format).await
    }
}

/// Locates the file yt-dlp produced for `stem`.
///
/// Prefers `stem.<expected_ext>`; otherwise takes any finished file with that
/// stem (the extension depends on the merged streams).
async fn find_output(dir: &Path, stem: &str, expected_ext: &str) -> Option<PathBuf> {
    let expected = dir.join(format!("{}.{}", stem, expected_ext));
    if tokio::fs::metadata(&expected).await.is_ok_and(|m| m.is_file()) {
        return Some(expected);
    }

    log::warn!("File not found at expected path: {}", expected.display());
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_candidate = path.file_stem().and_then(|s| s.to_str()) == Some(stem)
            && !matches!(path.extension().and_then(|e| e.to_str()), Some("part" | "ytdl" | "temp"));
        if is_candidate {
            return Some(path);
        }
    }
    None
}
