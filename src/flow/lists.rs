//! List management: creating lists, adding channels, the list views.

use anyhow::Result;
use teloxide::types::{ChatId, InlineKeyboardMarkup};
use tracing::{info, warn};

use super::engine::{FlowEngine, Notice};
use super::error::FlowError;
use super::keyboards;
use super::update::{IncomingCallback, IncomingMessage};
use crate::database::models::FlowState;
use crate::database::AddChannel;
use crate::utils::html_escape;

/// Longest accepted list name, in characters.
pub const MAX_LIST_NAME: usize = 255;

/// Outcome of validating a typed list name.
enum ListName<'a> {
    Valid(&'a str),
    Empty,
    TooLong,
}

fn validate_name(raw: &str) -> ListName<'_> {
    let name = raw.trim();
    if name.is_empty() {
        ListName::Empty
    } else if name.chars().count() > MAX_LIST_NAME {
        ListName::TooLong
    } else {
        ListName::Valid(name)
    }
}

impl FlowEngine {
    pub(super) async fn new_list(&self, chat_id: ChatId, user_id: i64, state: &FlowState) -> Result<()> {
        if let FlowState::AwaitingSendConfirmation { transmission_message_id } = state {
            self.discard_draft(user_id, *transmission_message_id).await?;
        }
        self.set_state(user_id, FlowState::AwaitingListName).await?;
        self.reply(
            chat_id,
            "📝 <b>Creating a new list...</b>\n\n\
             Please <b>send the name</b> for this transmission list (e.g. VIP Clients, Beta Partners).",
            Some(keyboards::cancel()),
        )
        .await
    }

    pub(super) async fn receive_list_name(&self, chat_id: ChatId, user_id: i64, text: &str) -> Result<()> {
        let name = match validate_name(text) {
            ListName::Valid(name) => name,
            ListName::Empty => {
                return self
                    .reply(chat_id, "The list name can't be empty. Please try again.", Some(keyboards::cancel()))
                    .await;
            }
            ListName::TooLong => {
                let text = format!("The list name can't be longer than {MAX_LIST_NAME} characters. Please try again.");
                return self.reply(chat_id, &text, Some(keyboards::cancel())).await;
            }
        };

        let list = self.lists.create_list(user_id, name).await?;
        info!(user_id, list_id = list.id, "List created");

        self.set_state(user_id, FlowState::AwaitingChannelMessage {
            current_list_id: list.id,
            created_in_flow: true,
        })
        .await?;

        let text = format!(
            "🎉 List <b>{}</b> created!\n\n\
             Now <b>forward a message</b> from each channel or group you want to add to this list.\n\n\
             When you're finished, send /done.",
            html_escape(&list.name)
        );
        self.reply(chat_id, &text, Some(keyboards::cancel())).await
    }

    pub(super) async fn receive_new_name(
        &self,
        chat_id: ChatId,
        user_id: i64,
        list_id: i64,
        text: &str,
    ) -> Result<()> {
        let name = match validate_name(text) {
            ListName::Valid(name) => name,
            ListName::Empty | ListName::TooLong => {
                let text = format!("Send a name between 1 and {MAX_LIST_NAME} characters.");
                return self.reply(chat_id, &text, Some(keyboards::cancel())).await;
            }
        };

        if self.lists.find_list(user_id, list_id).await?.is_none()
            || !self.lists.rename_list(list_id, name).await?
        {
            return Err(FlowError::ListNotFound(list_id).into());
        }
        info!(user_id, list_id, "List renamed");

        self.set_state(user_id, FlowState::Idle).await?;
        let text = format!("✏️ List renamed to <b>{}</b>.", html_escape(name));
        self.reply(chat_id, &text, Some(keyboards::new_list_and_commands())).await
    }

    /// A message arrived while channels are being added to `list_id`.
    pub(super) async fn receive_channel(&self, msg: &IncomingMessage, list_id: i64) -> Result<()> {
        let chat_id = msg.chat_id;
        let user_id = msg.from.user_id();

        if !msg.is_forward {
            return self
                .reply(
                    chat_id,
                    "Forward a message from the channel you want to add, or send /done to finish.",
                    Some(keyboards::done()),
                )
                .await;
        }

        let source = msg.forwarded_from.as_ref().ok_or(FlowError::MissingSourceChat)?;
        let new_channel = source.to_new_channel().ok_or(FlowError::MissingSourceChat)?;
        let display = html_escape(&source.display_name());

        if self.lists.find_list(user_id, list_id).await?.is_none() {
            return Err(FlowError::ListNotFound(list_id).into());
        }

        let rights = self.permissions.check_bot_permissions(source.id).await;
        if !rights.is_admin {
            let text = format!(
                "⚠️ <b>Couldn't add the channel: the bot is not an admin!</b>\n\n\
                 Make the bot an <b>administrator</b> of \"{display}\" so it can post there."
            );
            return self.reply(chat_id, &text, Some(keyboards::done())).await;
        }
        if !rights.can_post {
            let text = format!(
                "⚠️ <b>Couldn't add the channel: missing permission!</b>\n\n\
                 The bot is an admin of \"{display}\" but lacks the <b>Post Messages</b> right."
            );
            return self.reply(chat_id, &text, Some(keyboards::done())).await;
        }

        let duplicate = self.lists.channel_exists(list_id, source.id.0).await?
            || matches!(
                self.lists.add_channel(list_id, new_channel).await?,
                AddChannel::Duplicate
            );
        if duplicate {
            let text = format!("ℹ️ \"{display}\" is already in this list.");
            return self.reply(chat_id, &text, Some(keyboards::done())).await;
        }

        let count = self.lists.count_channels(list_id).await?;
        info!(user_id, list_id, chat_id = source.id.0, "Channel added to list");

        let text = format!(
            "➕ \"{display}\" added!\n\n\
             Channels in this list: <b>{count}</b>.\n\
             Forward more messages to add other channels, or send /done to finish."
        );
        self.reply(chat_id, &text, Some(keyboards::done())).await
    }

    pub(super) async fn finish_channels(&self, chat_id: ChatId, user_id: i64) -> Result<()> {
        self.set_state(user_id, FlowState::Idle).await?;
        self.reply(
            chat_id,
            "✅ Done adding channels! Your list is ready to use. Send /send to broadcast a message.",
            Some(keyboards::new_list()),
        )
        .await
    }

    /// Reset to idle, undoing whatever the current flow left half-done.
    /// The state is reset only after the cleanup succeeded.
    pub(super) async fn cancel(&self, chat_id: ChatId, user_id: i64, state: &FlowState) -> Result<()> {
        let text = match state {
            FlowState::AwaitingChannelMessage { current_list_id, created_in_flow: true } => {
                match self.lists.delete_list(*current_list_id).await? {
                    Some(list) => {
                        info!(user_id, list_id = list.id, "List deleted on cancel");
                        format!(
                            "❌ <b>Operation canceled!</b> The list <b>{}</b> and its channels were deleted.",
                            html_escape(&list.name)
                        )
                    }
                    None => "❌ <b>Operation canceled!</b>".to_string(),
                }
            }
            FlowState::AwaitingSendConfirmation { transmission_message_id } => {
                self.discard_draft(user_id, *transmission_message_id).await?;
                "❌ <b>Operation canceled!</b> Your message will not be sent.".to_string()
            }
            _ => "❌ <b>Operation canceled!</b>".to_string(),
        };

        self.set_state(user_id, FlowState::Idle).await?;
        self.reply(chat_id, &text, Some(keyboards::new_list())).await
    }

    pub(super) async fn lists_overview(&self, chat_id: ChatId, user_id: i64) -> Result<()> {
        let lists = self.lists.lists_for_owner(user_id).await?;
        if lists.is_empty() {
            return self
                .reply(
                    chat_id,
                    "⚠️ You don't have any transmission lists yet. Use /newlist to create your first one!",
                    Some(keyboards::new_list()),
                )
                .await;
        }

        let text = format!("📋 <b>Your lists</b> ({})\n\nTap a list to manage it.", lists.len());
        self.reply(chat_id, &text, Some(keyboards::lists_overview(&lists))).await
    }

    pub(super) async fn show_list(&self, cb: &IncomingCallback, list_id: i64) -> Result<Option<Notice>> {
        let user_id = cb.from.user_id();
        let Some(list) = self.lists.find_list(user_id, list_id).await? else {
            return Ok(Some(Notice::alert("❌ List not found.")));
        };

        let channels = self.lists.channels(list.id).await?;
        let text = if channels.is_empty() {
            format!(
                "📋 <b>{}</b>\n\nThis list has no channels yet. Use ➕ to add some.",
                html_escape(&list.name)
            )
        } else {
            format!(
                "📋 <b>{}</b>\n\nChannels: <b>{}</b>\nTap a channel to remove it from the list.",
                html_escape(&list.name),
                channels.len()
            )
        };

        self.show_in_place(cb, &text, Some(keyboards::list_view(list.id, &channels)))
            .await?;
        Ok(None)
    }

    /// Resume adding channels to an existing list.
    pub(super) async fn add_to_list(
        &self,
        chat_id: ChatId,
        user_id: i64,
        list_id: i64,
        state: &FlowState,
    ) -> Result<Option<Notice>> {
        let Some(list) = self.lists.find_list(user_id, list_id).await? else {
            return Ok(Some(Notice::alert("❌ List not found.")));
        };
        if let FlowState::AwaitingSendConfirmation { transmission_message_id } = state {
            self.discard_draft(user_id, *transmission_message_id).await?;
        }

        self.set_state(user_id, FlowState::AwaitingChannelMessage {
            current_list_id: list.id,
            created_in_flow: false,
        })
        .await?;

        let text = format!(
            "➕ Adding channels to <b>{}</b>.\n\n\
             <b>Forward a message</b> from each channel or group you want to add, then send /done.",
            html_escape(&list.name)
        );
        self.reply(chat_id, &text, Some(keyboards::done())).await?;
        Ok(None)
    }

    pub(super) async fn start_rename(
        &self,
        chat_id: ChatId,
        user_id: i64,
        list_id: i64,
        state: &FlowState,
    ) -> Result<Option<Notice>> {
        let Some(list) = self.lists.find_list(user_id, list_id).await? else {
            return Ok(Some(Notice::alert("❌ List not found.")));
        };
        if let FlowState::AwaitingSendConfirmation { transmission_message_id } = state {
            self.discard_draft(user_id, *transmission_message_id).await?;
        }

        self.set_state(user_id, FlowState::AwaitingListNameRename { list_id: list.id })
            .await?;

        let text = format!("✏️ Send the new name for <b>{}</b>.", html_escape(&list.name));
        self.reply(chat_id, &text, Some(keyboards::cancel())).await?;
        Ok(None)
    }

    pub(super) async fn delete_list(
        &self,
        cb: &IncomingCallback,
        list_id: i64,
        state: &FlowState,
    ) -> Result<Option<Notice>> {
        let user_id = cb.from.user_id();
        if self.lists.find_list(user_id, list_id).await?.is_none() {
            return Ok(Some(Notice::alert("❌ List not found.")));
        }

        let Some(list) = self.lists.delete_list(list_id).await? else {
            return Ok(Some(Notice::alert("❌ List not found.")));
        };
        info!(user_id, list_id, "List deleted");

        let refers_to_list = match state {
            FlowState::AwaitingChannelMessage { current_list_id, .. } => *current_list_id == list_id,
            FlowState::AwaitingListNameRename { list_id: id } => *id == list_id,
            FlowState::AwaitingMessageForSend { transmission_list_id } => *transmission_list_id == list_id,
            _ => false,
        };
        if refers_to_list {
            self.set_state(user_id, FlowState::Idle).await?;
        }

        let text = format!("🗑 List <b>{}</b> and its channels were deleted.", html_escape(&list.name));
        self.show_in_place(cb, &text, Some(keyboards::new_list())).await?;
        Ok(None)
    }

    pub(super) async fn delete_channel(&self, cb: &IncomingCallback, channel_id: i64) -> Result<Option<Notice>> {
        let user_id = cb.from.user_id();
        let Some(channel) = self.lists.find_channel(channel_id).await? else {
            return Ok(Some(Notice::alert("❌ Channel not found.")));
        };
        // Only the list owner may edit it.
        if self
            .lists
            .find_list(user_id, channel.transmission_list_id)
            .await?
            .is_none()
        {
            return Ok(Some(Notice::alert("❌ Channel not found.")));
        }

        self.lists.delete_channel(channel.id).await?;
        info!(
            user_id,
            list_id = channel.transmission_list_id,
            chat_id = channel.chat_id,
            "Channel removed from list"
        );

        self.show_list(cb, channel.transmission_list_id).await
    }

    pub(super) async fn close_keyboard(&self, cb: &IncomingCallback) -> Result<()> {
        if let (Some(chat_id), Some(message_id)) = (cb.chat_id, cb.message_id) {
            self.api.edit_reply_markup(chat_id, message_id, None).await?;
        }
        Ok(())
    }

    /// Edit the message carrying the pressed keyboard, or send a new one when
    /// it is no longer accessible.
    pub(super) async fn show_in_place(
        &self,
        cb: &IncomingCallback,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        match (cb.chat_id, cb.message_id) {
            (Some(chat_id), Some(message_id)) => {
                if let Err(e) = self
                    .api
                    .edit_message_text(chat_id, message_id, text, keyboard.clone())
                    .await
                {
                    warn!("Failed to edit message {} in chat {}: {}", message_id.0, chat_id, e);
                    self.reply(chat_id, text, keyboard).await?;
                }
                Ok(())
            }
            _ => self.reply(cb.reply_chat(), text, keyboard).await,
        }
    }
}
