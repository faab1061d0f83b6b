//! Chat-side seam: inbound events, the user's choice, and the outbound
//! actions the flow needs from a messenger.
//!
//! The Telegram binding lives in the bot crate; tests use a recording gateway.

use async_trait::async_trait;
use std::path::Path;

use crate::session::IdentityId;

/// Error type returned by gateway implementations
pub type GatewayError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Callback payload of the audio button
pub const AUDIO_ONLY_DATA: &str = "audio_only";

/// Prefix of format button payloads
pub const FORMAT_PREFIX: &str = "format|";

/// A chat to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef(pub i64);

/// A message the gateway sent or received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: ChatRef,
    pub message_id: i32,
}

/// What the user picked on the preview keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChoice {
    AudioOnly,
    Format(String),
}

impl SelectionChoice {
    /// Parses button callback data.
    ///
    /// Accepts `audio_only`, `format|<id>` and the `format:<id>` spelling.
    ///
    /// ```
    /// use tubecore::gateway::SelectionChoice;
    ///
    /// assert_eq!(SelectionChoice::parse("audio_only"), Some(SelectionChoice::AudioOnly));
    /// assert_eq!(
    ///     SelectionChoice::parse("format|137+bestaudio"),
    ///     Some(SelectionChoice::Format("137+bestaudio".to_string()))
    /// );
    /// assert_eq!(SelectionChoice::parse("pv:cancel"), None);
    /// ```
    pub fn parse(data: &str) -> Option<Self> {
        if data == AUDIO_ONLY_DATA {
            return Some(SelectionChoice::AudioOnly);
        }
        let id = data.strip_prefix(FORMAT_PREFIX).or_else(|| data.strip_prefix("format:"))?;
        if id.is_empty() {
            None
        } else {
            Some(SelectionChoice::Format(id.to_string()))
        }
    }

    /// Encodes the choice as button callback data.
    pub fn to_callback_data(&self) -> String {
        match self {
            SelectionChoice::AudioOnly => AUDIO_ONLY_DATA.to_string(),
            SelectionChoice::Format(id) => format!("{}{}", FORMAT_PREFIX, id),
        }
    }
}

/// One keyboard button (one per row)
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub choice: SelectionChoice,
}

/// Media attached to the preview message
#[derive(Debug, Clone, Copy)]
pub enum PreviewMedia<'a> {
    Image(&'a Path),
    Document(&'a Path),
    /// No thumbnail available; send the caption as text
    None,
}

/// A text message from a user
#[derive(Debug, Clone)]
pub struct TextEvent {
    pub identity: IdentityId,
    pub chat: ChatRef,
    pub text: String,
}

/// A button press on a preview message
#[derive(Debug, Clone)]
pub struct SelectionEvent {
    pub identity: IdentityId,
    pub chat: ChatRef,
    /// The preview message carrying the keyboard, if still accessible
    pub message: Option<MessageRef>,
    pub choice: SelectionChoice,
}

/// Outbound messenger actions. Captions are HTML.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<MessageRef, GatewayError>;

    async fn send_preview(
        &self,
        chat: ChatRef,
        media: PreviewMedia<'_>,
        caption: &str,
        buttons: &[Button],
    ) -> Result<MessageRef, GatewayError>;

    async fn send_audio(&self, chat: ChatRef, path: &Path, caption: &str) -> Result<MessageRef, GatewayError>;

    async fn send_video(&self, chat: ChatRef, path: &Path, caption: &str) -> Result<MessageRef, GatewayError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError>;

    /// Shows a "typing" indicator
    async fn typing(&self, chat: ChatRef) -> Result<(), GatewayError>;
}
