//! Update dispatcher setup.
//!
//! Routes private messages and callback queries to the flow engine. Every
//! endpoint returns `Ok`: the engine handles and logs its own failures, so
//! nothing reaches the update listener as an error.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{Chat, MessageOrigin, User};
use tracing::debug;

use crate::database::models::ChannelKind;
use crate::database::UserRepo;
use crate::flow::{FlowEngine, ForwardedChat, IncomingCallback, IncomingMessage, Sender};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Conversation state machine.
    pub engine: Arc<FlowEngine>,

    /// User repository, upserted on every interaction.
    pub users: Arc<UserRepo>,
}

/// Build the dispatcher.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Ignoring update {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("Error in update handler"))
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    // Only private chats take part in the conversation.
    let message_handler = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .inspect_async(track_message_user)
        .endpoint(on_message);

    let callback_handler = Update::filter_callback_query()
        .inspect_async(track_callback_user)
        .endpoint(on_callback);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}

async fn on_message(msg: Message, state: AppState) -> anyhow::Result<()> {
    match incoming_message(&msg) {
        Some(incoming) => state.engine.handle_message(incoming).await,
        None => debug!("Ignoring message {} without sender", msg.id.0),
    }
    Ok(())
}

async fn on_callback(q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    state.engine.handle_callback(incoming_callback(&q)).await;
    Ok(())
}

/// Track user from message (runs before the endpoint).
async fn track_message_user(msg: Message, state: AppState) {
    if let Some(user) = msg.from.as_ref() {
        state.users.clone().upsert_background(user.clone());
    }
}

async fn track_callback_user(q: CallbackQuery, state: AppState) {
    state.users.clone().upsert_background(q.from.clone());
}

fn sender(user: &User) -> Sender {
    Sender {
        id: user.id,
        first_name: user.first_name.clone(),
        is_bot: user.is_bot,
    }
}

fn incoming_message(msg: &Message) -> Option<IncomingMessage> {
    let from = msg.from.as_ref()?;
    let origin = msg.forward_origin();

    Some(IncomingMessage {
        chat_id: msg.chat.id,
        message_id: msg.id,
        from: sender(from),
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        forwarded_from: origin.and_then(forwarded_chat),
        is_forward: origin.is_some(),
    })
}

fn incoming_callback(q: &CallbackQuery) -> IncomingCallback {
    IncomingCallback {
        id: q.id.clone(),
        from: sender(&q.from),
        chat_id: q.message.as_ref().map(|m| m.chat().id),
        message_id: q.message.as_ref().map(|m| m.id()),
        data: q.data.clone().unwrap_or_default(),
    }
}

/// Source chat of a forward. Forwards from users carry no chat.
fn forwarded_chat(origin: &MessageOrigin) -> Option<ForwardedChat> {
    let chat = match origin {
        MessageOrigin::Channel { chat, .. } => chat,
        MessageOrigin::Chat { sender_chat, .. } => sender_chat,
        _ => return None,
    };

    Some(ForwardedChat {
        id: chat.id,
        title: chat.title().map(str::to_string),
        username: chat.username().map(str::to_string),
        kind: channel_kind(chat),
    })
}

fn channel_kind(chat: &Chat) -> Option<ChannelKind> {
    if chat.is_channel() {
        Some(ChannelKind::Channel)
    } else if chat.is_supergroup() {
        Some(ChannelKind::Supergroup)
    } else if chat.is_group() {
        Some(ChannelKind::Group)
    } else {
        None
    }
}
