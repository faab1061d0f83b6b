use std::time::Duration;
use thiserror::Error;

/// Centralized error type for the download pipeline.
///
/// Every collaborator failure is converted into one of these variants at the
/// orchestrator boundary, and the chat flow turns them into user-visible text.
///
/// # Example
///
/// ```
/// use tubecore::core::error::AppError;
///
/// let err = AppError::ExhaustedCandidates;
/// assert_eq!(err.to_string(), "No smaller resolution available.");
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid startup configuration (fatal)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Metadata lookup failed (unreachable or invalid source)
    #[error("{0}")]
    Extraction(String),

    /// A single retrieval attempt failed
    #[error("{0}")]
    Retrieval(String),

    /// Every candidate was too large for the transport
    #[error("No smaller resolution available.")]
    ExhaustedCandidates,

    /// Thumbnail endpoint answered with a non-success status
    #[error("Failed to download thumbnail (HTTP {0}).")]
    ThumbnailFetch(reqwest::StatusCode),

    /// A collaborator call exceeded its deadline
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout { operation: &'static str, after: Duration },

    /// Shutdown was requested while the operation was running
    #[error("Operation cancelled")]
    Cancelled,

    /// No session for the identity (expired or never created)
    #[error("Video information not found. Please resend the link.")]
    SessionNotFound,

    /// A selection for this identity is already being processed
    #[error("A download is already in progress. Please wait.")]
    AlreadyInProgress,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AppError {
    /// Short category name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration",
            AppError::Extraction(_) => "extraction",
            AppError::Retrieval(_) => "retrieval",
            AppError::ExhaustedCandidates => "exhausted_candidates",
            AppError::ThumbnailFetch(_) => "thumbnail_fetch",
            AppError::Timeout { .. } => "timeout",
            AppError::Cancelled => "cancelled",
            AppError::SessionNotFound => "session_not_found",
            AppError::AlreadyInProgress => "already_in_progress",
            AppError::Io(_) => "io",
            AppError::Http(_) => "http",
        }
    }
}
