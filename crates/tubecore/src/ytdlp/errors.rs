//! Classification of yt-dlp failures from its stderr.

/// Broad category of a yt-dlp failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YtDlpErrorType {
    /// The site wants a signed-in session or flagged the request as a bot
    BotDetection,
    /// Private, removed or region-locked
    VideoUnavailable,
    /// The requested format id does not exist (any more)
    FormatUnavailable,
    /// Timeouts, refused connections, DNS
    NetworkError,
    /// ffmpeg merge or audio extraction failed
    PostprocessingError,
    /// No space left on the working volume
    DiskSpaceError,
    Unknown,
}

impl YtDlpErrorType {
    /// Label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            YtDlpErrorType::BotDetection => "bot_detection",
            YtDlpErrorType::VideoUnavailable => "video_unavailable",
            YtDlpErrorType::FormatUnavailable => "format_unavailable",
            YtDlpErrorType::NetworkError => "network",
            YtDlpErrorType::PostprocessingError => "postprocessing",
            YtDlpErrorType::DiskSpaceError => "disk_space",
            YtDlpErrorType::Unknown => "unknown",
        }
    }
}

/// Determines the error type from yt-dlp's stderr.
pub fn analyze_ytdlp_error(stderr: &str) -> YtDlpErrorType {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("sign in to confirm you're not a bot")
        || stderr_lower.contains("please sign in")
        || stderr_lower.contains("http error 403")
        || stderr_lower.contains("signature extraction failed")
    {
        return YtDlpErrorType::BotDetection;
    }

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("this video does not exist")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    if stderr_lower.contains("requested format is not available") {
        return YtDlpErrorType::FormatUnavailable;
    }

    if stderr_lower.contains("no space left on device") {
        return YtDlpErrorType::DiskSpaceError;
    }

    if stderr_lower.contains("postprocessing")
        || stderr_lower.contains("ffmpeg")
        || stderr_lower.contains("error merging")
    {
        return YtDlpErrorType::PostprocessingError;
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network")
        || stderr_lower.contains("failed to resolve")
        || stderr_lower.contains("temporary failure in name resolution")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// Short explanation for the user
pub fn get_error_message(error_type: YtDlpErrorType) -> &'static str {
    match error_type {
        YtDlpErrorType::BotDetection => "YouTube blocked the request. Try again later.",
        YtDlpErrorType::VideoUnavailable => "The video is unavailable (private, removed or region-locked).",
        YtDlpErrorType::FormatUnavailable => "The selected format is no longer available.",
        YtDlpErrorType::NetworkError => "Network problem while contacting YouTube. Try again in a minute.",
        YtDlpErrorType::PostprocessingError => "Failed to convert the downloaded media.",
        YtDlpErrorType::DiskSpaceError => "The server is out of disk space.",
        YtDlpErrorType::Unknown => "Failed to process the link. Check that it is correct.",
    }
}

/// Last non-empty `ERROR:` line of stderr, or the last line if none is tagged.
pub fn last_error_line(stderr: &str) -> Option<&str> {
    let lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    lines
        .clone()
        .filter(|l| l.starts_with("ERROR:"))
        .last()
        .or_else(|| lines.last())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_bot_detection() {
        let stderr = "ERROR: [youtube] abc: Sign in to confirm you're not a bot";
        assert_eq!(analyze_ytdlp_error(stderr), YtDlpErrorType::BotDetection);
    }

    #[test]
    fn test_analyze_unavailable() {
        assert_eq!(
            analyze_ytdlp_error("ERROR: [youtube] abc: Private video. Sign in if you've been granted access"),
            YtDlpErrorType::VideoUnavailable
        );
        assert_eq!(analyze_ytdlp_error("ERROR: Video unavailable"), YtDlpErrorType::VideoUnavailable);
    }

    #[test]
    fn test_analyze_format_and_disk() {
        assert_eq!(
            analyze_ytdlp_error("ERROR: [youtube] abc: Requested format is not available"),
            YtDlpErrorType::FormatUnavailable
        );
        assert_eq!(
            analyze_ytdlp_error("OSError: [Errno 28] No space left on device"),
            YtDlpErrorType::DiskSpaceError
        );
    }

    #[test]
    fn test_analyze_network_and_unknown() {
        assert_eq!(
            analyze_ytdlp_error("urlopen error [Errno -3] Temporary failure in name resolution"),
            YtDlpErrorType::NetworkError
        );
        assert_eq!(analyze_ytdlp_error("something odd"), YtDlpErrorType::Unknown);
    }

    #[test]
    fn test_last_error_line() {
        let stderr = "WARNING: x\nERROR: first\n[download] 10%\nERROR: second\n\n";
        assert_eq!(last_error_line(stderr), Some("ERROR: second"));
        assert_eq!(last_error_line("just a line\n"), Some("just a line"));
        assert_eq!(last_error_line("  \n"), None);
    }
}
