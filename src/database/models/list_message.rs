//! Messages queued for broadcast.

use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, MessageId};

/// Delivery status of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sending,
    Sent,
    PartialSuccess,
    Failed,
    Canceled,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// One canonical copy of a payload in the storage channel, plus its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionListMessage {
    pub id: i64,
    /// Telegram user ID of the sender.
    pub owner_id: i64,
    #[serde(default)]
    pub transmission_list_id: Option<i64>,
    pub drive_chat_id: i64,
    /// Unique across all messages.
    pub drive_message_id: i32,
    pub status: MessageStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TransmissionListMessage {
    pub fn drive_chat(&self) -> ChatId {
        ChatId(self.drive_chat_id)
    }

    pub fn drive_message(&self) -> MessageId {
        MessageId(self.drive_message_id)
    }
}

/// Fields needed to store a draft; the repository assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub owner_id: i64,
    pub transmission_list_id: i64,
    pub drive_chat_id: i64,
    pub drive_message_id: i32,
}
