//! Chat gateway that records every outbound action

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use tubecore::gateway::{Button, ChatGateway, ChatRef, GatewayError, MessageRef, PreviewMedia};

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Text(String),
    Preview {
        /// "image", "document" or "none"
        media: &'static str,
        caption: String,
        buttons: Vec<Button>,
    },
    Audio {
        caption: String,
        size_bytes: u64,
    },
    Video {
        caption: String,
        size_bytes: u64,
        path: PathBuf,
    },
    Delete(i32),
    Typing,
}

#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    next_id: AtomicI32,
    fail_previews: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose `send_preview` always fails
    pub fn failing_previews() -> Self {
        Self {
            fail_previews: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall, chat: ChatRef) -> MessageRef {
        self.calls.lock().unwrap().push(call);
        MessageRef {
            chat,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<MessageRef, GatewayError> {
        Ok(self.record(GatewayCall::Text(text.to_string()), chat))
    }

    async fn send_preview(
        &self,
        chat: ChatRef,
        media: PreviewMedia<'_>,
        caption: &str,
        buttons: &[Button],
    ) -> Result<MessageRef, GatewayError> {
        if self.fail_previews {
            return Err("Bad Request: message is too long".into());
        }
        let media = match media {
            PreviewMedia::Image(_) => "image",
            PreviewMedia::Document(_) => "document",
            PreviewMedia::None => "none",
        };
        Ok(self.record(
            GatewayCall::Preview {
                media,
                caption: caption.to_string(),
                buttons: buttons.to_vec(),
            },
            chat,
        ))
    }

    async fn send_audio(&self, chat: ChatRef, path: &Path, caption: &str) -> Result<MessageRef, GatewayError> {
        let call = GatewayCall::Audio {
            caption: caption.to_string(),
            size_bytes: file_size(path),
        };
        Ok(self.record(call, chat))
    }

    async fn send_video(&self, chat: ChatRef, path: &Path, caption: &str) -> Result<MessageRef, GatewayError> {
        let call = GatewayCall::Video {
            caption: caption.to_string(),
            size_bytes: file_size(path),
            path: path.to_path_buf(),
        };
        Ok(self.record(call, chat))
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::Delete(message.message_id));
        Ok(())
    }

    async fn typing(&self, _chat: ChatRef) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::Typing);
        Ok(())
    }
}
