//! Handler types and dependencies

use std::sync::Arc;

use teloxide::types::{CallbackQuery, Message};
use tokio_util::task::TaskTracker;
use tubecore::gateway::{ChatRef, MessageRef, SelectionChoice, SelectionEvent, TextEvent};
use tubecore::{IdentityId, InteractionFlow};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub flow: Arc<InteractionFlow>,
    /// Selections run as tracked background tasks so shutdown can wait for them
    pub tasks: TaskTracker,
}

impl HandlerDeps {
    pub fn new(flow: Arc<InteractionFlow>, tasks: TaskTracker) -> Self {
        Self { flow, tasks }
    }
}

/// The sender of a message, falling back to the chat for anonymous posts
pub fn identity_of(msg: &Message) -> IdentityId {
    let user = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok());
    IdentityId(user.unwrap_or(msg.chat.id.0))
}

pub fn text_event(msg: &Message) -> Option<TextEvent> {
    Some(TextEvent {
        identity: identity_of(msg),
        chat: ChatRef(msg.chat.id.0),
        text: msg.text()?.to_string(),
    })
}

/// Builds a selection event from a button press.
///
/// Returns `None` for callback data that is not a format choice.
pub fn selection_event(q: &CallbackQuery) -> Option<SelectionEvent> {
    let choice = SelectionChoice::parse(q.data.as_deref()?)?;
    let identity = IdentityId(i64::try_from(q.from.id.0).ok()?);
    let message = q.message.as_ref().map(|m| MessageRef {
        chat: ChatRef(m.chat().id.0),
        message_id: m.id().0,
    });
    // Private chats share the user's id
    let chat = message.map(|m| m.chat).unwrap_or(ChatRef(identity.0));

    Some(SelectionEvent {
        identity,
        chat,
        message,
        choice,
    })
}
