//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;
use tubecore::flow::WELCOME_TEXT;

use super::types::{selection_event, text_event, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;

/// Creates the dispatcher schema for the bot.
///
/// Commands first, then plain text (links), then button presses.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(command_handler())
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

fn command_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| async move {
            log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
            let text = match cmd {
                Command::Start => WELCOME_TEXT.to_string(),
                Command::Help => format!("{}\n\n{}", WELCOME_TEXT, Command::descriptions()),
            };
            bot.send_message(msg.chat.id, text).await?;
            Ok(())
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| text_event(&msg))
        .endpoint(move |event: tubecore::gateway::TextEvent| {
            let deps = deps.clone();
            async move {
                log::info!("Text from {:?}: {}", event.identity, event.text);
                deps.flow.handle_text(event).await;
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query: {}", e);
            }

            let Some(event) = selection_event(&q) else {
                log::warn!("Ignoring callback with unknown data: {:?}", q.data);
                return Ok(());
            };

            log::info!("Selection {:?} from {:?}", event.choice, event.identity);
            let flow = deps.flow.clone();
            deps.tasks.spawn(async move {
                flow.handle_selection(event).await;
            });
            Ok(())
        }
    })
}
