//! In-memory fakes of the transport and storage seams, for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId, UserId};

use crate::bot::transport::{BotApi, ChatAdmin, MemberStatus};
use crate::database::models::{
    FlowState, MessageStatus, NewChannel, NewMessage, TransmissionList, TransmissionListChannel,
    TransmissionListMessage, UserState,
};
use crate::database::{AddChannel, ListStore, StateStore};

pub const BOT_ID: UserId = UserId(777);
pub const STORAGE_CHANNEL: ChatId = ChatId(-100_500);
pub const ADMIN_CHANNEL: ChatId = ChatId(-100_900);

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub callback_id: String,
    pub text: Option<String>,
    pub show_alert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCall {
    pub to: ChatId,
    pub from: ChatId,
    pub message_id: MessageId,
}

#[derive(Default)]
struct BotInner {
    next_message_id: i32,
    sent: Vec<SentMessage>,
    edits: Vec<SentMessage>,
    markup_edits: Vec<(ChatId, MessageId, Option<InlineKeyboardMarkup>)>,
    answers: Vec<Answer>,
    copies: Vec<CopyCall>,
    forwards: Vec<CopyCall>,
    deletions: Vec<(ChatId, MessageId)>,
    admins: HashMap<ChatId, Vec<ChatAdmin>>,
    members: HashMap<(ChatId, UserId), MemberStatus>,
    failing_copies: HashSet<ChatId>,
    fail_deletes: bool,
    member_queries: usize,
}

impl BotInner {
    fn next_id(&mut self) -> MessageId {
        self.next_message_id += 1;
        MessageId(1000 + self.next_message_id)
    }
}

/// Recording [`BotApi`]. Chats without configured admins or members answer
/// with an error, like Telegram does for chats the bot is not in.
#[derive(Default)]
pub struct FakeBot {
    inner: Mutex<BotInner>,
}

impl FakeBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_admins(&self, chat_id: ChatId, admins: Vec<ChatAdmin>) {
        self.inner.lock().admins.insert(chat_id, admins);
    }

    /// Make the bot an administrator of `chat_id`.
    pub fn make_bot_admin(&self, chat_id: ChatId, can_post: bool) {
        self.set_admins(chat_id, vec![ChatAdmin { user_id: BOT_ID, can_post_messages: can_post }]);
    }

    pub fn set_member(&self, chat_id: ChatId, user_id: UserId, status: MemberStatus) {
        self.inner.lock().members.insert((chat_id, user_id), status);
    }

    pub fn fail_copies_to(&self, chat_id: ChatId) {
        self.inner.lock().failing_copies.insert(chat_id);
    }

    pub fn fail_deletes(&self) {
        self.inner.lock().fail_deletes = true;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().sent.clone()
    }

    pub fn last_sent(&self) -> Option<SentMessage> {
        self.inner.lock().sent.last().cloned()
    }

    pub fn edits(&self) -> Vec<SentMessage> {
        self.inner.lock().edits.clone()
    }

    pub fn markup_edits(&self) -> Vec<(ChatId, MessageId, Option<InlineKeyboardMarkup>)> {
        self.inner.lock().markup_edits.clone()
    }

    pub fn answers(&self) -> Vec<Answer> {
        self.inner.lock().answers.clone()
    }

    pub fn copies(&self) -> Vec<CopyCall> {
        self.inner.lock().copies.clone()
    }

    pub fn forwards(&self) -> Vec<CopyCall> {
        self.inner.lock().forwards.clone()
    }

    pub fn deletions(&self) -> Vec<(ChatId, MessageId)> {
        self.inner.lock().deletions.clone()
    }

    pub fn member_queries(&self) -> usize {
        self.inner.lock().member_queries
    }
}

#[async_trait]
impl BotApi for FakeBot {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId> {
        let mut inner = self.inner.lock();
        inner.sent.push(SentMessage { chat_id, text: text.to_string(), keyboard });
        Ok(inner.next_id())
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        _message_id: MessageId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        self.inner
            .lock()
            .edits
            .push(SentMessage { chat_id, text: text.to_string(), keyboard });
        Ok(())
    }

    async fn edit_reply_markup(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        self.inner.lock().markup_edits.push((chat_id, message_id, keyboard));
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        self.inner.lock().answers.push(Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
            show_alert,
        });
        Ok(())
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        let mut inner = self.inner.lock();
        inner.copies.push(CopyCall { to, from, message_id });
        if inner.failing_copies.contains(&to) {
            return Err(anyhow!("Forbidden: bot was kicked from the channel chat"));
        }
        Ok(inner.next_id())
    }

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageId> {
        let mut inner = self.inner.lock();
        inner.forwards.push(CopyCall { to, from, message_id });
        if inner.failing_copies.contains(&to) {
            return Err(anyhow!("Forbidden: bot is not a member of the channel chat"));
        }
        Ok(inner.next_id())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.deletions.push((chat_id, message_id));
        if inner.fail_deletes {
            return Err(anyhow!("Bad Request: message can't be deleted"));
        }
        Ok(())
    }

    async fn chat_administrators(&self, chat_id: ChatId) -> Result<Vec<ChatAdmin>> {
        self.inner
            .lock()
            .admins
            .get(&chat_id)
            .cloned()
            .ok_or_else(|| anyhow!("Forbidden: bot is not a member of the channel chat"))
    }

    async fn chat_member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus> {
        let mut inner = self.inner.lock();
        inner.member_queries += 1;
        inner
            .members
            .get(&(chat_id, user_id))
            .copied()
            .ok_or_else(|| anyhow!("Bad Request: user not found"))
    }
}

/// [`StateStore`] over a map.
#[derive(Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<i64, UserState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, user_id: i64) -> Option<FlowState> {
        self.states.lock().get(&user_id).map(|s| s.state.clone())
    }

    pub fn set(&self, user_id: i64, state: FlowState) {
        self.states.lock().insert(user_id, UserState::new(user_id, state));
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, user_id: i64) -> Result<Option<UserState>> {
        Ok(self.states.lock().get(&user_id).cloned())
    }

    async fn upsert(&self, user_id: i64, state: FlowState) -> Result<()> {
        self.set(user_id, state);
        Ok(())
    }
}

#[derive(Default)]
struct ListsInner {
    next_id: i64,
    lists: BTreeMap<i64, TransmissionList>,
    channels: BTreeMap<i64, TransmissionListChannel>,
    messages: BTreeMap<i64, TransmissionListMessage>,
    status_history: Vec<(i64, MessageStatus)>,
    fail_channel_loads: bool,
    fail_list_deletes: bool,
}

impl ListsInner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// [`ListStore`] over ordered maps, with the same uniqueness and cascade
/// rules as the MongoDB repository.
#[derive(Default)]
pub struct InMemoryListStore {
    inner: Mutex<ListsInner>,
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_channel_loads(&self) {
        self.inner.lock().fail_channel_loads = true;
    }

    pub fn fail_list_deletes(&self, fail: bool) {
        self.inner.lock().fail_list_deletes = fail;
    }

    pub fn all_lists(&self) -> Vec<TransmissionList> {
        self.inner.lock().lists.values().cloned().collect()
    }

    pub fn list(&self, list_id: i64) -> Option<TransmissionList> {
        self.inner.lock().lists.get(&list_id).cloned()
    }

    pub fn channels_of(&self, list_id: i64) -> Vec<TransmissionListChannel> {
        self.inner
            .lock()
            .channels
            .values()
            .filter(|c| c.transmission_list_id == list_id)
            .cloned()
            .collect()
    }

    pub fn message(&self, message_id: i64) -> Option<TransmissionListMessage> {
        self.inner.lock().messages.get(&message_id).cloned()
    }

    pub fn all_messages(&self) -> Vec<TransmissionListMessage> {
        self.inner.lock().messages.values().cloned().collect()
    }

    pub fn status_history(&self, message_id: i64) -> Vec<MessageStatus> {
        self.inner
            .lock()
            .status_history
            .iter()
            .filter(|(id, _)| *id == message_id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn create_list(&self, owner_id: i64, name: &str) -> Result<TransmissionList> {
        let mut inner = self.inner.lock();
        let list = TransmissionList::new(inner.next_id(), owner_id, name);
        inner.lists.insert(list.id, list.clone());
        Ok(list)
    }

    async fn find_list(&self, owner_id: i64, list_id: i64) -> Result<Option<TransmissionList>> {
        Ok(self
            .inner
            .lock()
            .lists
            .get(&list_id)
            .filter(|l| l.owner_id == owner_id)
            .cloned())
    }

    async fn lists_for_owner(&self, owner_id: i64) -> Result<Vec<TransmissionList>> {
        Ok(self
            .inner
            .lock()
            .lists
            .values()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn rename_list(&self, list_id: i64, name: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        Ok(match inner.lists.get_mut(&list_id) {
            Some(list) => {
                list.name = name.to_string();
                true
            }
            None => false,
        })
    }

    async fn delete_list(&self, list_id: i64) -> Result<Option<TransmissionList>> {
        let mut inner = self.inner.lock();
        if inner.fail_list_deletes {
            return Err(anyhow!("write concern timeout while deleting list"));
        }
        let deleted = inner.lists.remove(&list_id);
        if deleted.is_some() {
            inner.channels.retain(|_, c| c.transmission_list_id != list_id);
            for message in inner.messages.values_mut() {
                if message.transmission_list_id == Some(list_id) {
                    message.transmission_list_id = None;
                }
            }
        }
        Ok(deleted)
    }

    async fn channel_exists(&self, list_id: i64, chat_id: i64) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .channels
            .values()
            .any(|c| c.transmission_list_id == list_id && c.chat_id == chat_id))
    }

    async fn add_channel(&self, list_id: i64, channel: NewChannel) -> Result<AddChannel> {
        let mut inner = self.inner.lock();
        let duplicate = inner
            .channels
            .values()
            .any(|c| c.transmission_list_id == list_id && c.chat_id == channel.chat_id);
        if duplicate {
            return Ok(AddChannel::Duplicate);
        }
        let row = TransmissionListChannel {
            id: inner.next_id(),
            transmission_list_id: list_id,
            chat_id: channel.chat_id,
            chat_name: channel.chat_name,
            username: channel.username,
            kind: channel.kind,
            created_at: chrono::Utc::now().timestamp(),
        };
        inner.channels.insert(row.id, row.clone());
        Ok(AddChannel::Added(row))
    }

    async fn count_channels(&self, list_id: i64) -> Result<u64> {
        Ok(self.channels_of(list_id).len() as u64)
    }

    async fn channels(&self, list_id: i64) -> Result<Vec<TransmissionListChannel>> {
        if self.inner.lock().fail_channel_loads {
            return Err(anyhow!("connection reset while loading channels"));
        }
        Ok(self.channels_of(list_id))
    }

    async fn find_channel(&self, channel_id: i64) -> Result<Option<TransmissionListChannel>> {
        Ok(self.inner.lock().channels.get(&channel_id).cloned())
    }

    async fn delete_channel(&self, channel_id: i64) -> Result<bool> {
        Ok(self.inner.lock().channels.remove(&channel_id).is_some())
    }

    async fn create_message(&self, message: NewMessage) -> Result<TransmissionListMessage> {
        let mut inner = self.inner.lock();
        if inner
            .messages
            .values()
            .any(|m| m.drive_message_id == message.drive_message_id)
        {
            return Err(anyhow!("duplicate drive_message_id {}", message.drive_message_id));
        }
        let now = chrono::Utc::now().timestamp();
        let row = TransmissionListMessage {
            id: inner.next_id(),
            owner_id: message.owner_id,
            transmission_list_id: Some(message.transmission_list_id),
            drive_chat_id: message.drive_chat_id,
            drive_message_id: message.drive_message_id,
            status: MessageStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.messages.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_message(
        &self,
        owner_id: i64,
        message_id: i64,
    ) -> Result<Option<TransmissionListMessage>> {
        Ok(self
            .inner
            .lock()
            .messages
            .get(&message_id)
            .filter(|m| m.owner_id == owner_id)
            .cloned())
    }

    async fn set_message_status(&self, message_id: i64, status: MessageStatus) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.status_history.push((message_id, status));
        if let Some(message) = inner.messages.get_mut(&message_id) {
            message.status = status;
        }
        Ok(())
    }

    async fn delete_message(&self, message_id: i64) -> Result<bool> {
        Ok(self.inner.lock().messages.remove(&message_id).is_some())
    }
}
