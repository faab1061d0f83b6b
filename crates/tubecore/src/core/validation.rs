//! URL validation for inbound text
//!
//! Only YouTube links start a catalog request; everything else gets a hint.

use url::Url;

/// Hosts (and their subdomains) accepted as video sources
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];

/// Extracts a supported video-source URL from message text.
///
/// The text is trimmed and must be a single http(s) URL on a known host.
///
/// # Examples
/// ```
/// use tubecore::core::validation::parse_video_url;
///
/// assert!(parse_video_url("https://youtu.be/dQw4w9WgXcQ").is_some());
/// assert!(parse_video_url("  https://www.youtube.com/watch?v=dQw4w9WgXcQ ").is_some());
/// assert!(parse_video_url("https://evil.com/watch?v=dQw4w9WgXcQ").is_none());
/// assert!(parse_video_url("hello").is_none());
/// ```
pub fn parse_video_url(text: &str) -> Option<Url> {
    let parsed = Url::parse(text.trim()).ok()?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    let known = VIDEO_HOSTS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)));

    known.then_some(parsed)
}
