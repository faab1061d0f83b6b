//! Small formatting helpers shared by the pipeline and the chat layer.

use crate::core::config::limits::MIB;

/// Characters that are not allowed in a local file name
const UNSAFE_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Replaces filesystem-unsafe characters with `_`.
///
/// # Example
///
/// ```
/// use tubecore::core::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c?"), "a_b_c_");
/// assert_eq!(sanitize_filename("video"), "video");
/// ```
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Formats a duration as `m:ss` (minutes are not wrapped into hours).
pub fn format_duration(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Converts a byte count to mebibytes rounded to one decimal place.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / MIB as f64 * 10.0).round() / 10.0
}

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}
