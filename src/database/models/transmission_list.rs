//! Transmission lists and their member channels.

use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;

/// A named collection of target chats owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionList {
    pub id: i64,
    /// Telegram user ID of the owner.
    pub owner_id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TransmissionList {
    pub fn new(id: i64, owner_id: i64, name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            owner_id,
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Kind of target chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Channel,
    Group,
    Supergroup,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Supergroup => "supergroup",
        }
    }
}

/// A chat that belongs to a list. `(transmission_list_id, chat_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionListChannel {
    pub id: i64,
    pub transmission_list_id: i64,
    /// Telegram chat ID (usually a large negative number).
    pub chat_id: i64,
    #[serde(default)]
    pub chat_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub created_at: i64,
}

impl TransmissionListChannel {
    pub fn chat(&self) -> ChatId {
        ChatId(self.chat_id)
    }

    /// Name for display: title, then @username, then the raw id.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.chat_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match &self.username {
            Some(u) => format!("@{}", u),
            None => self.chat_id.to_string(),
        }
    }
}

/// Fields needed to add a channel; the repository assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub chat_id: i64,
    pub chat_name: Option<String>,
    pub username: Option<String>,
    pub kind: ChannelKind,
}
