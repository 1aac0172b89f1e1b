//! Bot transport seam.
//!
//! The flow engine, the permission checker and the broadcast dispatcher talk
//! to Telegram only through [`BotApi`]. The production implementation wraps
//! the throttled teloxide bot; tests substitute a recording fake.

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatMemberStatus, InlineKeyboardMarkup, MessageId, ParseMode, UserId,
};

use super::dispatcher::ThrottledBot;

/// One administrator entry of a chat, reduced to what permission checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAdmin {
    pub user_id: UserId,
    pub can_post_messages: bool,
}

/// Membership status of a user in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    /// Whether the user counts as subscribed to the chat.
    pub fn is_subscribed(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

impl From<ChatMemberStatus> for MemberStatus {
    fn from(status: ChatMemberStatus) -> Self {
        match status {
            ChatMemberStatus::Owner => Self::Creator,
            ChatMemberStatus::Administrator => Self::Administrator,
            ChatMemberStatus::Member => Self::Member,
            ChatMemberStatus::Restricted => Self::Restricted,
            ChatMemberStatus::Left => Self::Left,
            ChatMemberStatus::Banned => Self::Banned,
        }
    }
}

/// Telegram operations used by the bot. Every text is sent as HTML.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId>;

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()>;

    /// Replace the inline keyboard; `None` removes it.
    async fn edit_reply_markup(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()>;

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()>;

    /// Copy without forwarded-from attribution. Returns the new message id.
    async fn copy_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId>;

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    async fn chat_administrators(&self, chat_id: ChatId) -> Result<Vec<ChatAdmin>>;

    async fn chat_member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus>;
}

/// [`BotApi`] over the throttled teloxide bot.
#[derive(Clone)]
pub struct TelegramApi {
    bot: ThrottledBot,
}

impl TelegramApi {
    pub fn new(bot: ThrottledBot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl BotApi for TelegramApi {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId> {
        let mut req = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(keyboard);
        }
        Ok(req.await?.id)
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut req = self
            .bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(keyboard);
        }
        req.await?;
        Ok(())
    }

    async fn edit_reply_markup(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let keyboard = keyboard.unwrap_or_default();
        self.bot
            .edit_message_reply_markup(chat_id, message_id)
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let mut req = self.bot.answer_callback_query(callback_id).show_alert(show_alert);
        if let Some(text) = text {
            req = req.text(text);
        }
        req.await?;
        Ok(())
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        Ok(self.bot.copy_message(to, from, message_id).await?)
    }

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        Ok(self.bot.forward_message(to, from, message_id).await?.id)
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.bot.delete_message(chat_id, message_id).await?;
        Ok(())
    }

    async fn chat_administrators(&self, chat_id: ChatId) -> Result<Vec<ChatAdmin>> {
        let members = self.bot.get_chat_administrators(chat_id).await?;
        Ok(members
            .iter()
            .map(|member| ChatAdmin {
                user_id: member.user.id,
                can_post_messages: member.kind.can_post_messages(),
            })
            .collect())
    }

    async fn chat_member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus> {
        let member = self.bot.get_chat_member(chat_id, user_id).await?;
        Ok(member.kind.status().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribed_statuses() {
        assert!(MemberStatus::Creator.is_subscribed());
        assert!(MemberStatus::Administrator.is_subscribed());
        assert!(MemberStatus::Member.is_subscribed());
        assert!(!MemberStatus::Restricted.is_subscribed());
        assert!(!MemberStatus::Left.is_subscribed());
        assert!(!MemberStatus::Banned.is_subscribed());
    }
}
