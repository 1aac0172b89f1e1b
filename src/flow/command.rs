//! Bot commands.

use teloxide::utils::command::BotCommands;

/// All bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "List all commands")]
    Commands,

    #[command(description = "Check that the bot is online")]
    Status,

    #[command(description = "Create a new transmission list")]
    NewList,

    #[command(description = "Send a message to one of your lists")]
    Send,

    #[command(description = "Manage your lists")]
    Lists,

    #[command(description = "Finish adding channels")]
    Done,

    #[command(description = "Cancel the current operation")]
    Cancel,
}

impl Command {
    /// Parse a command from message text.
    ///
    /// Only the first token counts, its case is ignored and an `@botname`
    /// suffix addressed to this bot is accepted. Returns `None` for plain text
    /// and for commands this bot does not know.
    pub fn from_text(text: &str, bot_username: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        if !token.starts_with('/') {
            return None;
        }
        Self::parse(&token.to_lowercase(), &bot_username.to_lowercase()).ok()
    }

    /// Whether `text` looks like a command at all, known or not.
    pub fn is_command_like(text: &str) -> bool {
        text.trim_start().starts_with('/')
    }
}
