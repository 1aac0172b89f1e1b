//! Broadcast dispatcher.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::bot::transport::BotApi;
use crate::database::models::{MessageStatus, TransmissionListChannel, TransmissionListMessage};
use crate::database::ListStore;

/// Per-broadcast outcome counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    pub status: MessageStatus,
}

/// A failure outside the per-channel loop. The message is left `failed`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("message {0} is not attached to a list")]
    NoList(i64),

    #[error("failed to mark message {id} as sending: {reason}")]
    MarkSending { id: i64, reason: anyhow::Error },

    #[error("failed to load channels of list {list_id}: {reason}")]
    LoadChannels { list_id: i64, reason: anyhow::Error },
}

/// Aggregate status from the counts.
pub fn final_status(sent: usize, failed: usize) -> MessageStatus {
    match (sent, failed) {
        (0, _) => MessageStatus::Failed,
        (_, 0) => MessageStatus::Sent,
        _ => MessageStatus::PartialSuccess,
    }
}

pub struct BroadcastDispatcher {
    api: Arc<dyn BotApi>,
    lists: Arc<dyn ListStore>,
    concurrency: usize,
}

impl BroadcastDispatcher {
    pub fn new(api: Arc<dyn BotApi>, lists: Arc<dyn ListStore>, concurrency: usize) -> Self {
        Self {
            api,
            lists,
            concurrency: concurrency.max(1),
        }
    }

    /// Copy `message` to every channel of its list.
    ///
    /// Channel failures are counted and never stop the others. Once started a
    /// broadcast runs to completion.
    pub async fn dispatch(
        &self,
        message: &TransmissionListMessage,
    ) -> Result<DispatchReport, DispatchError> {
        match self.deliver(message).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Broadcast of message {} aborted: {}", message.id, e);
                if let Err(mark) = self
                    .lists
                    .set_message_status(message.id, MessageStatus::Failed)
                    .await
                {
                    error!("Failed to mark message {} as failed: {}", message.id, mark);
                }
                Err(e)
            }
        }
    }

    async fn deliver(
        &self,
        message: &TransmissionListMessage,
    ) -> Result<DispatchReport, DispatchError> {
        let list_id = message
            .transmission_list_id
            .ok_or(DispatchError::NoList(message.id))?;

        self.lists
            .set_message_status(message.id, MessageStatus::Sending)
            .await
            .map_err(|reason| DispatchError::MarkSending { id: message.id, reason })?;

        let channels = self
            .lists
            .channels(list_id)
            .await
            .map_err(|reason| DispatchError::LoadChannels { list_id, reason })?;

        let (sent, failed) = if channels.is_empty() {
            warn!("List {} has no channels; message {} not sent", list_id, message.id);
            (0, 0)
        } else {
            self.copy_to_all(message, &channels).await
        };

        let status = final_status(sent, failed);
        // Delivery already happened; a failed status write is only logged.
        if let Err(e) = self.lists.set_message_status(message.id, status).await {
            error!("Failed to record status {} for message {}: {}", status.as_str(), message.id, e);
        }

        info!(
            "Broadcast of message {} to list {} finished: {} sent, {} failed ({})",
            message.id,
            list_id,
            sent,
            failed,
            status.as_str()
        );

        Ok(DispatchReport { sent, failed, status })
    }

    /// Every attempt completes before counts are aggregated.
    async fn copy_to_all(
        &self,
        message: &TransmissionListMessage,
        channels: &[TransmissionListChannel],
    ) -> (usize, usize) {
        let from = message.drive_chat();
        let message_id = message.drive_message();

        // Futures are built eagerly (still polled lazily) to avoid a rustc
        // higher-ranked `Send` inference failure with `stream::iter(&[T]).map`.
        let attempts: Vec<_> = channels
            .iter()
            .map(|channel| async move {
                match self.api.copy_message(channel.chat(), from, message_id).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(
                            "Failed to copy message {} to channel {} ({}): {}",
                            message.id,
                            channel.chat_id,
                            channel.display_name(),
                            e
                        );
                        false
                    }
                }
            })
            .collect();
        let outcomes: Vec<bool> = stream::iter(attempts)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let sent = outcomes.iter().filter(|ok| **ok).count();
        (sent, outcomes.len() - sent)
    }
}
