//! Transport-neutral view of inbound updates.
//!
//! The router converts teloxide messages and callback queries into these
//! structs so the engine can be driven by tests without building full
//! Telegram payloads.

use teloxide::types::{ChatId, MessageId, UserId};

use crate::database::models::{ChannelKind, NewChannel};

/// Who sent an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub first_name: String,
    pub is_bot: bool,
}

impl Sender {
    pub fn user_id(&self) -> i64 {
        self.id.0 as i64
    }
}

/// The chat a forwarded message originally came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedChat {
    pub id: ChatId,
    pub title: Option<String>,
    pub username: Option<String>,
    /// `None` for private chats, which cannot be list members.
    pub kind: Option<ChannelKind>,
}

impl ForwardedChat {
    /// Row to store, if the chat is a channel or a group.
    pub fn to_new_channel(&self) -> Option<NewChannel> {
        Some(NewChannel {
            chat_id: self.id.0,
            chat_name: self.title.clone(),
            username: self.username.clone(),
            kind: self.kind?,
        })
    }

    pub fn display_name(&self) -> String {
        match (&self.title, &self.username) {
            (Some(title), _) if !title.is_empty() => title.clone(),
            (_, Some(username)) => format!("@{}", username),
            _ => self.id.to_string(),
        }
    }
}

/// A private message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub from: Sender,
    /// Text or caption.
    pub text: Option<String>,
    /// Source chat of a forward, when Telegram discloses it.
    pub forwarded_from: Option<ForwardedChat>,
    /// Set for every forward, even when the origin is hidden.
    pub is_forward: bool,
}

/// A button press on one of the bot's inline keyboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallback {
    pub id: String,
    pub from: Sender,
    /// Chat and message carrying the keyboard; absent for inaccessible messages.
    pub chat_id: Option<ChatId>,
    pub message_id: Option<MessageId>,
    pub data: String,
}

impl IncomingCallback {
    /// Chat to answer in: the keyboard's chat, or the user's private chat.
    pub fn reply_chat(&self) -> ChatId {
        self.chat_id.unwrap_or(ChatId(self.from.user_id()))
    }
}
