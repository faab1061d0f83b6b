use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::AppError;

/// Environment variables checked for the bot credential, in priority order.
pub const TOKEN_VARS: &[&str] = &["TELEGRAM_BOT_TOKEN", "BOT_TOKEN", "TELOXIDE_TOKEN"];

/// Size limits
pub mod limits {
    /// One mebibyte
    pub const MIB: u64 = 1024 * 1024;

    /// Maximum video size the transport accepts (50 MB, standard Bot API)
    pub const DEFAULT_MAX_VIDEO_SIZE_MB: u64 = 50;

    /// Thumbnails at or above this size go out as a document instead of a photo
    pub const DEFAULT_THUMBNAIL_DOCUMENT_THRESHOLD_MB: u64 = 10;

    /// Upper bound on retrieval attempts for one selection
    pub const DEFAULT_MAX_ATTEMPTS: usize = 8;
}

/// Transcoding targets passed to the extractor
pub mod media {
    pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 192;
    pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";
    pub const DEFAULT_VIDEO_FORMAT: &str = "mp4";
}

/// Deadlines for collaborator calls
pub mod timeouts {
    use super::Duration;

    /// Metadata fetch timeout (in seconds)
    pub const METADATA_TIMEOUT_SECS: u64 = 240; // slow extractors need a few minutes

    /// Single retrieval attempt timeout (in seconds)
    pub const RETRIEVAL_TIMEOUT_SECS: u64 = 900; // 15 minutes

    /// Thumbnail HTTP timeout (in seconds)
    pub const THUMBNAIL_TIMEOUT_SECS: u64 = 30;

    /// Bot API request timeout (in seconds); covers uploads of large files
    pub const TELEGRAM_REQUEST_TIMEOUT_SECS: u64 = 600;

    pub fn metadata() -> Duration {
        Duration::from_secs(METADATA_TIMEOUT_SECS)
    }

    pub fn retrieval() -> Duration {
        Duration::from_secs(RETRIEVAL_TIMEOUT_SECS)
    }

    pub fn thumbnail() -> Duration {
        Duration::from_secs(THUMBNAIL_TIMEOUT_SECS)
    }

    pub fn telegram_request() -> Duration {
        Duration::from_secs(TELEGRAM_REQUEST_TIMEOUT_SECS)
    }
}

/// Settings for the download pipeline. None of these are required.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Video artifacts above this size trigger the fallback to a smaller candidate
    pub max_video_size_bytes: u64,
    /// Thumbnail delivery-shape threshold
    pub thumbnail_document_threshold_bytes: u64,
    pub audio_bitrate_kbps: u32,
    pub audio_format: String,
    pub video_format: String,
    /// Working directory for downloaded media
    pub download_folder: PathBuf,
    /// Working directory for thumbnails
    pub temp_dir: PathBuf,
    pub ytdl_bin: String,
    pub metadata_timeout: Duration,
    pub retrieval_timeout: Duration,
    pub thumbnail_timeout: Duration,
    pub max_attempts: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_video_size_bytes: limits::DEFAULT_MAX_VIDEO_SIZE_MB * limits::MIB,
            thumbnail_document_threshold_bytes: limits::DEFAULT_THUMBNAIL_DOCUMENT_THRESHOLD_MB * limits::MIB,
            audio_bitrate_kbps: media::DEFAULT_AUDIO_BITRATE_KBPS,
            audio_format: media::DEFAULT_AUDIO_FORMAT.to_string(),
            video_format: media::DEFAULT_VIDEO_FORMAT.to_string(),
            download_folder: PathBuf::from("downloads"),
            temp_dir: PathBuf::from("temp"),
            ytdl_bin: "yt-dlp".to_string(),
            metadata_timeout: timeouts::metadata(),
            retrieval_timeout: timeouts::retrieval(),
            thumbnail_timeout: timeouts::thumbnail(),
            max_attempts: limits::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PipelineSettings {
    /// Reads pipeline settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads pipeline settings through an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            max_video_size_bytes: parse_or(get("MAX_VIDEO_SIZE_MB"), "MAX_VIDEO_SIZE_MB", limits::DEFAULT_MAX_VIDEO_SIZE_MB)
                .saturating_mul(limits::MIB),
            thumbnail_document_threshold_bytes: parse_or(
                get("THUMBNAIL_DOCUMENT_THRESHOLD_MB"),
                "THUMBNAIL_DOCUMENT_THRESHOLD_MB",
                limits::DEFAULT_THUMBNAIL_DOCUMENT_THRESHOLD_MB,
            )
            .saturating_mul(limits::MIB),
            audio_bitrate_kbps: parse_or(
                get("AUDIO_BITRATE_KBPS"),
                "AUDIO_BITRATE_KBPS",
                media::DEFAULT_AUDIO_BITRATE_KBPS,
            ),
            audio_format: get("AUDIO_FORMAT").unwrap_or(defaults.audio_format),
            video_format: get("VIDEO_FORMAT").unwrap_or(defaults.video_format),
            download_folder: get("DOWNLOAD_FOLDER").map(PathBuf::from).unwrap_or(defaults.download_folder),
            temp_dir: get("TEMP_FILES_DIR").map(PathBuf::from).unwrap_or(defaults.temp_dir),
            ytdl_bin: get("YTDL_BIN").unwrap_or(defaults.ytdl_bin),
            metadata_timeout: Duration::from_secs(parse_or(
                get("METADATA_TIMEOUT_SECS"),
                "METADATA_TIMEOUT_SECS",
                timeouts::METADATA_TIMEOUT_SECS,
            )),
            retrieval_timeout: Duration::from_secs(parse_or(
                get("RETRIEVAL_TIMEOUT_SECS"),
                "RETRIEVAL_TIMEOUT_SECS",
                timeouts::RETRIEVAL_TIMEOUT_SECS,
            )),
            thumbnail_timeout: defaults.thumbnail_timeout,
            max_attempts: parse_or(
                get("MAX_DOWNLOAD_ATTEMPTS"),
                "MAX_DOWNLOAD_ATTEMPTS",
                limits::DEFAULT_MAX_ATTEMPTS,
            )
            .max(1),
        }
    }
}

/// Bot-side settings. The token is the only required value in the system.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: SecretString,
    /// Custom Bot API server (local server lifts the 50 MB limit)
    pub bot_api_url: Option<String>,
    pub log_file_path: Option<String>,
    pub pipeline: PipelineSettings,
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` when no bot token is set, so the
    /// process can fail fast before connecting anywhere.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = TOKEN_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .ok_or_else(|| AppError::Configuration(format!("{} is not set", TOKEN_VARS[0])))?;

        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            bot_token: SecretString::from(token),
            bot_api_url: optional("BOT_API_URL"),
            log_file_path: optional("LOG_FILE_PATH"),
            pipeline: PipelineSettings::from_lookup(&lookup),
        })
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}='{}', using default {}", key, value, default);
            default
        }),
    }
}
