//! Storage seams used by the flow engine and the broadcast dispatcher.
//!
//! MongoDB repositories implement these traits in production; tests use the
//! in-memory fakes from `crate::testing`.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    FlowState, MessageStatus, NewChannel, NewMessage, TransmissionList, TransmissionListChannel,
    TransmissionListMessage, UserState,
};

/// Outcome of adding a channel to a list.
#[derive(Debug, Clone, PartialEq)]
pub enum AddChannel {
    Added(TransmissionListChannel),
    /// The chat is already in the list; nothing was written.
    Duplicate,
}

/// Per-user conversation state.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, user_id: i64) -> Result<Option<UserState>>;

    /// Replace the user's state wholesale.
    async fn upsert(&self, user_id: i64, state: FlowState) -> Result<()>;
}

/// Lists, their channels and queued messages.
#[async_trait]
pub trait ListStore: Send + Sync {
    async fn create_list(&self, owner_id: i64, name: &str) -> Result<TransmissionList>;

    /// Find a list only if it belongs to `owner_id`.
    async fn find_list(&self, owner_id: i64, list_id: i64) -> Result<Option<TransmissionList>>;

    async fn lists_for_owner(&self, owner_id: i64) -> Result<Vec<TransmissionList>>;

    async fn rename_list(&self, list_id: i64, name: &str) -> Result<bool>;

    /// Delete a list and all of its channels. Returns the deleted list.
    async fn delete_list(&self, list_id: i64) -> Result<Option<TransmissionList>>;

    async fn channel_exists(&self, list_id: i64, chat_id: i64) -> Result<bool>;

    async fn add_channel(&self, list_id: i64, channel: NewChannel) -> Result<AddChannel>;

    async fn count_channels(&self, list_id: i64) -> Result<u64>;

    async fn channels(&self, list_id: i64) -> Result<Vec<TransmissionListChannel>>;

    async fn find_channel(&self, channel_id: i64) -> Result<Option<TransmissionListChannel>>;

    async fn delete_channel(&self, channel_id: i64) -> Result<bool>;

    async fn create_message(&self, message: NewMessage) -> Result<TransmissionListMessage>;

    /// Find a message only if it was sent by `owner_id`.
    async fn find_message(
        &self,
        owner_id: i64,
        message_id: i64,
    ) -> Result<Option<TransmissionListMessage>>;

    async fn set_message_status(&self, message_id: i64, status: MessageStatus) -> Result<()>;

    async fn delete_message(&self, message_id: i64) -> Result<bool>;
}
