//! Chat interaction: turns inbound events into orchestrator calls and
//! replies through a [`ChatGateway`].
//!
//! Every collaborator failure ends here as a text message; nothing propagates
//! to the dispatcher.

use std::sync::Arc;

use crate::catalog::{Candidate, CandidateSelector};
use crate::core::utils::{escape_html, format_duration};
use crate::core::validation::parse_video_url;
use crate::gateway::{
    Button, ChatGateway, ChatRef, GatewayError, MessageRef, PreviewMedia, SelectionChoice, SelectionEvent, TextEvent,
};
use crate::orchestrator::{Delivery, DeliveryKind, DownloadOrchestrator, Presentation};
use crate::session::{Session, SessionSummary};
use crate::thumbnail::ThumbnailShape;

pub const WELCOME_TEXT: &str =
    "Hello! Send me a YouTube video link, and I'll show you the available download formats.";
pub const INVALID_LINK_TEXT: &str = "Please send a valid YouTube link.";
pub const DOWNLOADING_TEXT: &str = "Downloading... Please wait.";
pub const AUDIO_BUTTON_LABEL: &str = "🎧 Audio Only";
const SELECT_PROMPT: &str = "Select a quality to download or choose audio-only:";

/// HTML caption shown with the preview and with the delivered file.
///
/// ```
/// use tubecore::flow::caption;
/// use tubecore::session::SessionSummary;
///
/// let summary = SessionSummary { title: "A & B".into(), author: "Me".into(), duration_seconds: 65 };
/// let text = caption(&summary, "https://youtu.be/x", None);
/// assert!(text.starts_with("<b>A &amp; B</b>\n"));
/// assert!(text.contains("⏳ Duration: 1:05"));
/// ```
pub fn caption(summary: &SessionSummary, url: &str, prompt: Option<&str>) -> String {
    let mut text = format!(
        "<b>{}</b>\n🎥 <a href='{}'>Video Link</a>\n👤 Author: {}\n⏳ Duration: {}",
        escape_html(&summary.title),
        escape_html(url),
        escape_html(&summary.author),
        format_duration(summary.duration_seconds)
    );
    if let Some(prompt) = prompt {
        text.push_str("\n\n");
        text.push_str(prompt);
    }
    text
}

/// Audio button first, then one button per presented candidate.
pub fn selection_buttons(candidates: &[Candidate]) -> Vec<Button> {
    std::iter::once(Button {
        label: AUDIO_BUTTON_LABEL.to_string(),
        choice: SelectionChoice::AudioOnly,
    })
    .chain(candidates.iter().map(|c| Button {
        label: CandidateSelector::button_label(c),
        choice: SelectionChoice::Format(c.id.clone()),
    }))
    .collect()
}

/// Glue between a chat gateway and the orchestrator.
pub struct InteractionFlow {
    gateway: Arc<dyn ChatGateway>,
    orchestrator: DownloadOrchestrator,
}

impl InteractionFlow {
    pub fn new(gateway: Arc<dyn ChatGateway>, orchestrator: DownloadOrchestrator) -> Self {
        Self { gateway, orchestrator }
    }

    pub fn orchestrator(&self) -> &DownloadOrchestrator {
        &self.orchestrator
    }

    /// Handles a plain text message: a link gets the format picker, anything
    /// else a hint.
    pub async fn handle_text(&self, event: TextEvent) {
        let Some(url) = parse_video_url(&event.text) else {
            self.reply(event.chat, INVALID_LINK_TEXT).await;
            return;
        };

        self.typing(event.chat).await;

        let presentation = match self.orchestrator.present(event.identity, url).await {
            Ok(p) => p,
            Err(e) => {
                log::error!("Presentation for {:?} failed: {}", event.identity, e);
                self.reply(event.chat, &format!("Error processing video: {}", e)).await;
                return;
            }
        };

        if let Err(e) = self.send_preview(event.chat, &presentation).await {
            log::error!("Failed to send preview to {:?}: {}", event.chat, e);
            self.orchestrator.discard(event.identity, presentation.generation).await;
            self.reply(event.chat, &format!("Error processing video: {}", e)).await;
        }
        // Dropping the presentation removes the thumbnail file.
    }

    async fn send_preview(&self, chat: ChatRef, presentation: &Presentation) -> Result<MessageRef, GatewayError> {
        let summary = SessionSummary {
            title: presentation.metadata.title.clone(),
            author: presentation.metadata.author.clone(),
            duration_seconds: presentation.metadata.duration_seconds,
        };
        let text = caption(&summary, presentation.source_url.as_str(), Some(SELECT_PROMPT));
        let buttons = selection_buttons(&presentation.candidates);

        let media = match &presentation.thumbnail {
            Some(thumb) if thumb.shape == ThumbnailShape::Image => PreviewMedia::Image(thumb.artifact.path()),
            Some(thumb) => PreviewMedia::Document(thumb.artifact.path()),
            None => PreviewMedia::None,
        };
        self.gateway.send_preview(chat, media, &text, &buttons).await
    }

    /// Handles a button press on a preview message.
    ///
    /// The session is claimed before any chat side effect, so a repeated tap
    /// while a download runs only gets a short notice.
    pub async fn handle_selection(&self, event: SelectionEvent) {
        let session = match self.orchestrator.claim(event.identity).await {
            Ok(session) => session,
            Err(e) => {
                log::info!("Selection {:?} for {:?} rejected: {}", event.choice, event.identity, e);
                self.reply(event.chat, &e.to_string()).await;
                return;
            }
        };

        self.typing(event.chat).await;
        if let Some(preview) = event.message {
            self.delete(preview).await;
        }
        let status = match self.gateway.send_text(event.chat, DOWNLOADING_TEXT).await {
            Ok(message) => Some(message),
            Err(e) => {
                log::warn!("Failed to send status message to {:?}: {}", event.chat, e);
                None
            }
        };

        let outcome = self.deliver(&event, session).await;

        if let Err(e) = outcome {
            log::error!("Selection {:?} for {:?} failed: {}", event.choice, event.identity, e);
            self.reply(event.chat, &format!("Download error: {}", e)).await;
        }
        if let Some(status) = status {
            self.delete(status).await;
        }
    }

    async fn deliver(&self, event: &SelectionEvent, session: Session) -> Result<(), String> {
        let delivery: Delivery = self
            .orchestrator
            .select_claimed(event.identity, session, &event.choice)
            .await
            .map_err(|e| e.to_string())?;

        let summary = self.orchestrator.refresh_summary(&delivery).await;
        let text = caption(&summary, delivery.source_url.as_str(), None);
        let path = delivery.artifact.path();

        let sent = match delivery.kind {
            DeliveryKind::Audio => self.gateway.send_audio(event.chat, path, &text).await,
            DeliveryKind::Video => self.gateway.send_video(event.chat, path, &text).await,
        };
        sent.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn reply(&self, chat: ChatRef, text: &str) {
        if let Err(e) = self.gateway.send_text(chat, text).await {
            log::error!("Failed to send message to {:?}: {}", chat, e);
        }
    }

    async fn typing(&self, chat: ChatRef) {
        if let Err(e) = self.gateway.typing(chat).await {
            log::debug!("Typing indicator for {:?} failed: {}", chat, e);
        }
    }

    async fn delete(&self, message: MessageRef) {
        if let Err(e) = self.gateway.delete_message(message).await {
            log::warn!("Failed to delete message {}: {}", message.message_id, e);
        }
    }
}
