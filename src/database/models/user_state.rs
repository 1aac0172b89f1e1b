//! Per-user conversation state.
//!
//! The state and its data travel together as one enum so a state can never
//! carry keys that belong to another step. Serialized as
//! `{ "state": "<step>", "data": { .. } }`; unit steps omit `data`.

use serde::{Deserialize, Serialize};

/// The step a user is at in a multi-turn flow, with the data that step needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum FlowState {
    /// Resting state. Initial for new users and reached after every flow.
    #[default]
    Idle,

    /// `/newlist` was issued; the next text message is the list name.
    AwaitingListName,

    /// Forwarded messages add their source chat to `current_list_id`.
    AwaitingChannelMessage {
        current_list_id: i64,
        /// True when the list was created by this flow; `/cancel` only
        /// deletes lists it created.
        #[serde(default = "default_true")]
        created_in_flow: bool,
    },

    /// The next text message renames `list_id`.
    AwaitingListNameRename { list_id: i64 },

    /// The next message of any kind is stored for broadcast to the list.
    AwaitingMessageForSend { transmission_list_id: i64 },

    /// A stored draft waits for the confirm/cancel button.
    AwaitingSendConfirmation { transmission_message_id: i64 },
}

fn default_true() -> bool {
    true
}

impl FlowState {
    /// Stable name of the step, as persisted in the `state` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingListName => "awaiting_list_name",
            Self::AwaitingChannelMessage { .. } => "awaiting_channel_message",
            Self::AwaitingListNameRename { .. } => "awaiting_list_name_rename",
            Self::AwaitingMessageForSend { .. } => "awaiting_message_for_send",
            Self::AwaitingSendConfirmation { .. } => "awaiting_send_confirmation",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// The persisted state document, one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    /// Telegram user ID (unique).
    pub user_id: i64,
    #[serde(default)]
    pub state: FlowState,
    pub updated_at: i64,
}

impl UserState {
    pub fn new(user_id: i64, state: FlowState) -> Self {
        Self {
            user_id,
            state,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}
