//! `ChatGateway` on top of the Telegram Bot API.

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode};
use tubecore::gateway::{Button, ChatGateway, ChatRef, GatewayError, MessageRef, PreviewMedia};

/// Declared dimensions of delivered videos
const VIDEO_WIDTH: u32 = 1920;
const VIDEO_HEIGHT: u32 = 1080;

#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// One button per row, callback data from the tagged choice.
pub fn keyboard(buttons: &[Button]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.choice.to_callback_data())]),
    )
}

fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat: ChatRef(msg.chat.id.0),
        message_id: msg.id.0,
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<MessageRef, GatewayError> {
        let msg = self.bot.send_message(ChatId(chat.0), text).await?;
        Ok(message_ref(&msg))
    }

    async fn send_preview(
        &self,
        chat: ChatRef,
        media: PreviewMedia<'_>,
        caption: &str,
        buttons: &[Button],
    ) -> Result<MessageRef, GatewayError> {
        let chat_id = ChatId(chat.0);
        let markup = keyboard(buttons);

        let msg = match media {
            PreviewMedia::Image(path) => {
                self.bot
                    .send_photo(chat_id, InputFile::file(path.to_path_buf()))
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup)
                    .await?
            }
            PreviewMedia::Document(path) => {
                self.bot
                    .send_document(chat_id, InputFile::file(path.to_path_buf()))
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup)
                    .await?
            }
            PreviewMedia::None => {
                self.bot
                    .send_message(chat_id, caption)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup)
                    .await?
            }
        };
        Ok(message_ref(&msg))
    }

    async fn send_audio(&self, chat: ChatRef, path: &Path, caption: &str) -> Result<MessageRef, GatewayError> {
        log::info!("Sending audio {} to chat {}", path.display(), chat.0);
        let msg = self
            .bot
            .send_audio(ChatId(chat.0), InputFile::file(path.to_path_buf()))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(message_ref(&msg))
    }

    async fn send_video(&self, chat: ChatRef, path: &Path, caption: &str) -> Result<MessageRef, GatewayError> {
        log::info!("Sending video {} to chat {}", path.display(), chat.0);
        let msg = self
            .bot
            .send_video(ChatId(chat.0), InputFile::file(path.to_path_buf()))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .supports_streaming(true)
            .width(VIDEO_WIDTH)
            .height(VIDEO_HEIGHT)
            .await?;
        Ok(message_ref(&msg))
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError> {
        self.bot
            .delete_message(ChatId(message.chat.0), MessageId(message.message_id))
            .await?;
        Ok(())
    }

    async fn typing(&self, chat: ChatRef) -> Result<(), GatewayError> {
        self.bot.send_chat_action(ChatId(chat.0), ChatAction::Typing).await?;
        Ok(())
    }
}
