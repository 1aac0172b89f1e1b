//! The conversation state machine.
//!
//! Every inbound update runs under the sender's lock: state is read, a
//! decision is made, state is written, and only then is the next update of the
//! same user looked at. Handlers never fail outward; errors are logged and
//! turned into a reply.

use std::sync::Arc;

use anyhow::Result;
use teloxide::types::{ChatId, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use super::callback::{CallbackAction, ListAction};
use super::command::Command;
use super::error::FlowError;
use super::keyboards;
use super::locks::UserLocks;
use super::update::{IncomingCallback, IncomingMessage, Sender};
use crate::bot::transport::BotApi;
use crate::broadcast::BroadcastDispatcher;
use crate::config::FlowConfig;
use crate::database::models::FlowState;
use crate::database::{ListStore, StateStore};
use crate::permissions::Permissions;
use crate::utils::html_escape;

const GENERIC_ERROR: &str = "❌ Something went wrong on our side. Please try again.";
const UNRECOGNIZED: &str = "Command not recognized. Use /commands to see the list.";

/// Short text shown on a callback answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Notice {
    pub text: &'static str,
    pub alert: bool,
}

impl Notice {
    pub fn alert(text: &'static str) -> Self {
        Self { text, alert: true }
    }
}

pub struct FlowEngine {
    pub(super) api: Arc<dyn BotApi>,
    pub(super) states: Arc<dyn StateStore>,
    pub(super) lists: Arc<dyn ListStore>,
    pub(super) permissions: Permissions,
    pub(super) broadcaster: BroadcastDispatcher,
    pub(super) config: FlowConfig,
    locks: UserLocks,
}

impl FlowEngine {
    pub fn new(
        api: Arc<dyn BotApi>,
        states: Arc<dyn StateStore>,
        lists: Arc<dyn ListStore>,
        permissions: Permissions,
        config: FlowConfig,
    ) -> Self {
        let broadcaster =
            BroadcastDispatcher::new(api.clone(), lists.clone(), config.broadcast_concurrency);
        Self {
            api,
            states,
            lists,
            permissions,
            broadcaster,
            config,
            locks: UserLocks::new(),
        }
    }

    /// Handle a private message.
    pub async fn handle_message(&self, msg: IncomingMessage) {
        if msg.from.is_bot {
            return;
        }
        let user_id = msg.from.user_id();
        let _guard = self.locks.lock(user_id).await;

        if let Err(e) = self.on_message(&msg).await {
            self.report_failure(msg.chat_id, user_id, e).await;
        }
    }

    /// Handle a button press. The callback query is answered exactly once.
    pub async fn handle_callback(&self, cb: IncomingCallback) {
        let user_id = cb.from.user_id();
        let notice = {
            let _guard = self.locks.lock(user_id).await;
            match self.on_callback(&cb).await {
                Ok(notice) => notice,
                Err(e) => {
                    self.report_failure(cb.reply_chat(), user_id, e).await;
                    None
                }
            }
        };

        let (text, alert) = match &notice {
            Some(n) => (Some(n.text), n.alert),
            None => (None, false),
        };
        if let Err(e) = self.api.answer_callback_query(&cb.id, text, alert).await {
            warn!("Failed to answer callback query {}: {}", cb.id, e);
        }
    }

    /// Drop per-user locks that are no longer in use.
    pub fn forget_idle_locks(&self) {
        self.locks.forget_idle();
    }

    async fn on_message(&self, msg: &IncomingMessage) -> Result<()> {
        let user_id = msg.from.user_id();
        let text = msg.text.as_deref().unwrap_or_default();

        // A forwarded post is content, never a command.
        let command = if msg.is_forward {
            None
        } else {
            Command::from_text(text, &self.config.bot_username)
        };

        if command == Some(Command::Start) {
            return self.start(msg.chat_id, &msg.from).await;
        }

        if !self.ensure_subscribed(msg.chat_id, &msg.from).await? {
            return Ok(());
        }

        let state = self.load_state(user_id).await?;

        if let Some(command) = command {
            return self.run_command(command, msg.chat_id, &msg.from, &state).await;
        }
        if !msg.is_forward && Command::is_command_like(text) {
            return self.unrecognized(msg.chat_id, text).await;
        }

        match state {
            FlowState::AwaitingListName => self.receive_list_name(msg.chat_id, user_id, text).await,
            FlowState::AwaitingListNameRename { list_id } => {
                self.receive_new_name(msg.chat_id, user_id, list_id, text).await
            }
            FlowState::AwaitingChannelMessage { current_list_id, .. } => {
                self.receive_channel(msg, current_list_id).await
            }
            FlowState::AwaitingMessageForSend { transmission_list_id } => {
                self.store_for_send(msg, transmission_list_id).await
            }
            FlowState::Idle | FlowState::AwaitingSendConfirmation { .. } => {
                self.unrecognized(msg.chat_id, text).await
            }
        }
    }

    async fn on_callback(&self, cb: &IncomingCallback) -> Result<Option<Notice>> {
        let chat_id = cb.reply_chat();
        let user_id = cb.from.user_id();

        let Some(action) = CallbackAction::parse(&cb.data) else {
            debug!("Ignoring unknown callback data {:?} from user {}", cb.data, user_id);
            return Ok(None);
        };

        let command = match &action {
            CallbackAction::Command(text) => Command::from_text(text, &self.config.bot_username),
            _ => None,
        };
        if command == Some(Command::Start) {
            self.start(chat_id, &cb.from).await?;
            return Ok(None);
        }

        if !self.ensure_subscribed(chat_id, &cb.from).await? {
            return Ok(None);
        }

        let state = self.load_state(user_id).await?;

        match action {
            CallbackAction::Command(text) => {
                match command {
                    Some(command) => self.run_command(command, chat_id, &cb.from, &state).await?,
                    None => self.unrecognized(chat_id, &text).await?,
                }
                Ok(None)
            }
            CallbackAction::SelectList(list_id) => {
                self.select_list(chat_id, user_id, list_id, &state).await?;
                Ok(None)
            }
            CallbackAction::ConfirmSend(message_id) => self.confirm_send(cb, message_id, &state).await,
            CallbackAction::CancelSend(message_id) => self.cancel_send(cb, message_id, &state).await,
            CallbackAction::ViewList(list_id) => self.show_list(cb, list_id).await,
            CallbackAction::List(ListAction::Add, list_id) => {
                self.add_to_list(chat_id, user_id, list_id, &state).await
            }
            CallbackAction::List(ListAction::Send, list_id) => {
                self.select_list(chat_id, user_id, list_id, &state).await?;
                Ok(None)
            }
            CallbackAction::List(ListAction::Rename, list_id) => {
                self.start_rename(chat_id, user_id, list_id, &state).await
            }
            CallbackAction::List(ListAction::Delete, list_id) => {
                self.delete_list(cb, list_id, &state).await
            }
            CallbackAction::DeleteChannel(channel_id) => self.delete_channel(cb, channel_id).await,
            CallbackAction::CloseKeyboard => {
                self.close_keyboard(cb).await?;
                Ok(None)
            }
        }
    }

    /// Dispatch a recognized command. `/done` only means something while
    /// channels are being added.
    async fn run_command(
        &self,
        command: Command,
        chat_id: ChatId,
        sender: &Sender,
        state: &FlowState,
    ) -> Result<()> {
        let user_id = sender.user_id();
        debug!("User {} ran {:?} in state {}", user_id, command, state.name());

        match command {
            Command::Done => match state {
                FlowState::AwaitingChannelMessage { .. } => self.finish_channels(chat_id, user_id).await,
                _ => self.unrecognized(chat_id, "/done").await,
            },
            Command::Start => self.start(chat_id, sender).await,
            Command::Commands => self.list_commands(chat_id).await,
            Command::Status => {
                self.reply(chat_id, "✅ <b>The bot is online!</b>", Some(keyboards::new_list_and_commands()))
                    .await
            }
            Command::NewList => self.new_list(chat_id, user_id, state).await,
            Command::Send => self.send_picker(chat_id, user_id).await,
            Command::Lists => self.lists_overview(chat_id, user_id).await,
            Command::Cancel => self.cancel(chat_id, user_id, state).await,
        }
    }

    async fn start(&self, chat_id: ChatId, sender: &Sender) -> Result<()> {
        let text = format!(
            "🤖 <b>Hi, {}! I'm the Transmission List bot.</b>\n\n\
             Send /newlist to create a transmission list, /commands to see everything I can do, \
             and /cancel to stop any operation.\n\n\
             To use the bot you must be subscribed to our official channel.",
            html_escape(&sender.first_name)
        );
        self.reply(chat_id, &text, Some(keyboards::start(&self.config.admin_channel_invite_link)))
            .await
    }

    async fn list_commands(&self, chat_id: ChatId) -> Result<()> {
        let mut text = String::from("⚙️ <b>Available commands</b>\n\n");
        for command in Command::bot_commands() {
            let name = command.command.trim_start_matches('/');
            text.push_str(&format!("/{} - {}\n", name, html_escape(&command.description)));
        }
        self.reply(chat_id, &text, Some(keyboards::new_list_and_commands())).await
    }

    pub(super) async fn unrecognized(&self, chat_id: ChatId, text: &str) -> Result<()> {
        debug!("Unrecognized input in chat {}: {:?}", chat_id, text);
        self.reply(chat_id, UNRECOGNIZED, None).await
    }

    /// Gate on admin channel membership. A denied user is reset to idle, any
    /// draft awaiting confirmation is discarded, and they are told how to join.
    async fn ensure_subscribed(&self, chat_id: ChatId, sender: &Sender) -> Result<bool> {
        if self
            .permissions
            .is_channel_member(self.config.admin_channel_id, sender.id)
            .await
        {
            return Ok(true);
        }

        let user_id = sender.user_id();
        info!(user_id, "Denied: not subscribed to the admin channel");

        if let Some(current) = self.states.get(user_id).await? {
            if let FlowState::AwaitingSendConfirmation { transmission_message_id } = current.state {
                self.discard_draft(user_id, transmission_message_id).await?;
            }
            if !current.state.is_idle() {
                self.set_state(user_id, FlowState::Idle).await?;
            }
        }

        self.reply(
            chat_id,
            "🔒 <b>Access denied!</b> You must be subscribed to our official channel to use this bot.\n\n\
             Join the channel and try again.",
            keyboards::join(&self.config.admin_channel_invite_link),
        )
        .await?;
        Ok(false)
    }

    /// Current state, creating the idle record on first contact.
    async fn load_state(&self, user_id: i64) -> Result<FlowState> {
        match self.states.get(user_id).await? {
            Some(record) => Ok(record.state),
            None => {
                self.set_state(user_id, FlowState::Idle).await?;
                Ok(FlowState::Idle)
            }
        }
    }

    pub(super) async fn set_state(&self, user_id: i64, state: FlowState) -> Result<()> {
        debug!("User {} -> {}", user_id, state.name());
        self.states.upsert(user_id, state).await
    }

    pub(super) async fn reply(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        self.api.send_message(chat_id, text, keyboard).await?;
        Ok(())
    }

    async fn report_failure(&self, chat_id: ChatId, user_id: i64, e: anyhow::Error) {
        let text = match e.downcast_ref::<FlowError>() {
            Some(flow) => {
                error!(user_id, "Flow error: {}", flow);
                flow.user_message()
            }
            None => {
                error!(user_id, "Failed to handle update: {:#}", e);
                GENERIC_ERROR
            }
        };
        if let Err(e) = self.api.send_message(chat_id, text, None).await {
            warn!("Failed to report error to chat {}: {}", chat_id, e);
        }
    }
}
