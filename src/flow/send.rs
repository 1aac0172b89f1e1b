//! Sending: list picker, storing the draft, confirmation.

use anyhow::Result;
use teloxide::types::ChatId;
use tracing::{debug, error, info, warn};

use super::engine::{FlowEngine, Notice};
use super::error::FlowError;
use super::keyboards;
use super::update::{IncomingCallback, IncomingMessage};
use crate::config::DriveWriteMode;
use crate::database::models::{FlowState, MessageStatus, NewMessage, TransmissionListMessage};
use crate::utils::html_escape;

const UNKNOWN_LIST: &str = "unknown list";

impl FlowEngine {
    pub(super) async fn send_picker(&self, chat_id: ChatId, user_id: i64) -> Result<()> {
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

        self.reply(
            chat_id,
            "✉️ <b>Select the transmission list</b> you want to send your next message to:",
            Some(keyboards::select_list(&lists)),
        )
        .await
    }

    pub(super) async fn select_list(
        &self,
        chat_id: ChatId,
        user_id: i64,
        list_id: i64,
        state: &FlowState,
    ) -> Result<()> {
        let Some(list) = self.lists.find_list(user_id, list_id).await? else {
            return self
                .reply(chat_id, "❌ The selected list was not found or does not belong to you.", None)
                .await;
        };

        if let FlowState::AwaitingSendConfirmation { transmission_message_id } = state {
            self.discard_draft(user_id, *transmission_message_id).await?;
        }

        self.set_state(user_id, FlowState::AwaitingMessageForSend { transmission_list_id: list.id })
            .await?;

        let text = format!(
            "✅ List <b>{}</b> selected!\n\n\
             Now <b>send or forward the message</b> (text, photo, video, ...) you want to broadcast \
             to every channel of this list.",
            html_escape(&list.name)
        );
        self.reply(chat_id, &text, Some(keyboards::cancel())).await
    }

    /// Store the user's message in the storage channel and ask for confirmation.
    pub(super) async fn store_for_send(&self, msg: &IncomingMessage, list_id: i64) -> Result<()> {
        let user_id = msg.from.user_id();
        let storage = self
            .config
            .storage_channel_id
            .ok_or(FlowError::StorageNotConfigured)?;

        let list = self
            .lists
            .find_list(user_id, list_id)
            .await?
            .ok_or(FlowError::ListNotFound(list_id))?;

        let written = match self.config.drive_write_mode {
            DriveWriteMode::Copy => self.api.copy_message(storage, msg.chat_id, msg.message_id).await,
            DriveWriteMode::Forward => {
                self.api.forward_message(storage, msg.chat_id, msg.message_id).await
            }
        };
        let drive_message_id = written.map_err(|e| FlowError::StorageWrite(e.to_string()))?;

        let record = NewMessage {
            owner_id: user_id,
            transmission_list_id: list.id,
            drive_chat_id: storage.0,
            drive_message_id: drive_message_id.0,
        };
        let message = match self.lists.create_message(record).await {
            Ok(message) => message,
            Err(e) => {
                if let Err(del) = self.api.delete_message(storage, drive_message_id).await {
                    warn!("Failed to delete orphaned storage copy {}: {}", drive_message_id.0, del);
                }
                return Err(e);
            }
        };
        info!(user_id, list_id, message_id = message.id, "Message stored for broadcast");

        self.set_state(user_id, FlowState::AwaitingSendConfirmation {
            transmission_message_id: message.id,
        })
        .await?;

        let channels = self.lists.count_channels(list.id).await?;
        let text = format!(
            "🎉 <b>Message received and stored!</b>\n\n\
             It is ready to be sent to the list <b>{}</b> ({} channel(s)).\n\n\
             <b>Send it now?</b>",
            html_escape(&list.name),
            channels
        );
        self.reply(msg.chat_id, &text, Some(keyboards::confirm_send(message.id)))
            .await
    }

    /// Confirm button: close the prompt, broadcast, report the counts.
    pub(super) async fn confirm_send(
        &self,
        cb: &IncomingCallback,
        message_id: i64,
        state: &FlowState,
    ) -> Result<Option<Notice>> {
        let user_id = cb.from.user_id();
        let message = match self.pending_message(cb, message_id, state).await? {
            Ok(message) => message,
            Err(notice) => return Ok(Some(notice)),
        };

        self.set_state(user_id, FlowState::Idle).await?;
        let list_name = self.list_name(user_id, &message).await?;

        self.show_in_place(
            cb,
            &format!("🚀 <b>Sending...</b> Your message is going out to <b>{list_name}</b>."),
            None,
        )
        .await?;

        let chat_id = cb.reply_chat();
        let text = match self.broadcaster.dispatch(&message).await {
            Ok(report) => {
                let headline = match report.status {
                    MessageStatus::Sent => "✅ <b>Broadcast finished!</b>",
                    MessageStatus::PartialSuccess => "⚠️ <b>Broadcast partially delivered.</b>",
                    _ => "❌ <b>Broadcast failed.</b>",
                };
                format!(
                    "{headline}\n\nList: <b>{list_name}</b>\nDelivered: <b>{}</b>\nFailed: <b>{}</b>",
                    report.sent, report.failed
                )
            }
            Err(e) => {
                error!(user_id, message_id, "Broadcast failed: {}", e);
                format!("❌ <b>The broadcast to {list_name} failed.</b> Please try again later.")
            }
        };
        self.reply(chat_id, &text, Some(keyboards::new_list_and_commands()))
            .await?;
        Ok(None)
    }

    /// Cancel button: drop the draft and its storage copy.
    pub(super) async fn cancel_send(
        &self,
        cb: &IncomingCallback,
        message_id: i64,
        state: &FlowState,
    ) -> Result<Option<Notice>> {
        let user_id = cb.from.user_id();
        let message = match self.pending_message(cb, message_id, state).await? {
            Ok(message) => message,
            Err(notice) => return Ok(Some(notice)),
        };

        self.set_state(user_id, FlowState::Idle).await?;
        let list_name = self.list_name(user_id, &message).await?;
        self.discard(&message).await?;

        self.show_in_place(
            cb,
            &format!(
                "🚫 <b>Sending canceled!</b> The message for <b>{list_name}</b> will not be sent \
                 and was removed from storage."
            ),
            None,
        )
        .await?;
        Ok(None)
    }

    /// Discard the user's pending draft, if it is still pending.
    pub(super) async fn discard_draft(&self, user_id: i64, message_id: i64) -> Result<()> {
        match self.lists.find_message(user_id, message_id).await? {
            Some(message) if message.status == MessageStatus::Pending => self.discard(&message).await,
            _ => Ok(()),
        }
    }

    /// Mark canceled, delete the storage copy (best effort), delete the row.
    async fn discard(&self, message: &TransmissionListMessage) -> Result<()> {
        self.lists
            .set_message_status(message.id, MessageStatus::Canceled)
            .await?;

        if let Err(e) = self
            .api
            .delete_message(message.drive_chat(), message.drive_message())
            .await
        {
            warn!(
                "Failed to delete storage copy {} of message {}: {}",
                message.drive_message_id, message.id, e
            );
        }

        self.lists.delete_message(message.id).await?;
        info!(user_id = message.owner_id, message_id = message.id, "Draft discarded");
        Ok(())
    }

    /// The user's message `message_id` if the user is confirming exactly that
    /// message and it is still pending. Otherwise the keyboard is removed and a
    /// notice explains why.
    async fn pending_message(
        &self,
        cb: &IncomingCallback,
        message_id: i64,
        state: &FlowState,
    ) -> Result<Result<TransmissionListMessage, Notice>> {
        let user_id = cb.from.user_id();
        let awaited = matches!(
            state,
            FlowState::AwaitingSendConfirmation { transmission_message_id } if *transmission_message_id == message_id
        );

        let notice = if awaited {
            match self.lists.find_message(user_id, message_id).await? {
                Some(message) if message.status == MessageStatus::Pending => return Ok(Ok(message)),
                Some(_) => Notice::alert("ℹ️ This message was already handled."),
                None => Notice::alert("❌ Message not found."),
            }
        } else {
            debug!(user_id, message_id, state = state.name(), "Confirmation button no longer active");
            Notice::alert("ℹ️ This confirmation is no longer active. Use /send to start again.")
        };

        if let Err(e) = self.close_keyboard(cb).await {
            warn!("Failed to remove stale confirmation keyboard: {}", e);
        }
        Ok(Err(notice))
    }

    async fn list_name(&self, user_id: i64, message: &TransmissionListMessage) -> Result<String> {
        let name = match message.transmission_list_id {
            Some(list_id) => self
                .lists
                .find_list(user_id, list_id)
                .await?
                .map(|list| html_escape(&list.name)),
            None => None,
        };
        Ok(name.unwrap_or_else(|| UNKNOWN_LIST.to_string()))
    }
}
