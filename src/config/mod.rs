//! Configuration module for the transmission bot.
//!
//! Loads configuration from environment variables once at startup. Nothing
//! below `main` reads the environment; the flow engine receives a
//! [`FlowConfig`] built from this struct.

use std::env;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use teloxide::types::ChatId;

/// Default number of channels copied to in parallel during a broadcast.
pub const DEFAULT_BROADCAST_CONCURRENCY: usize = 4;

/// Bot running mode
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

impl BotMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "webhook" => Self::Webhook,
            _ => Self::Polling,
        }
    }
}

/// How a user's message is written into the storage channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriveWriteMode {
    /// copyMessage: no "forwarded from" header.
    #[default]
    Copy,
    /// forwardMessage: keeps the original author attribution.
    Forward,
}

impl DriveWriteMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "forward" => Ok(Self::Forward),
            other => bail!("DRIVE_WRITE_MODE must be copy or forward, got {other}"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Private channel holding the canonical copy of each pending broadcast.
    pub storage_channel_id: Option<ChatId>,

    /// Channel whose membership gates every interaction with the bot.
    pub admin_channel_id: Option<ChatId>,

    /// Invite link shown to users who are not subscribed yet.
    pub admin_channel_invite_link: String,

    /// Parallel copies per broadcast.
    pub broadcast_concurrency: usize,

    pub drive_write_mode: DriveWriteMode,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_mode = var("BOT_MODE").map(|m| BotMode::parse(&m)).unwrap_or_default();
        let webhook_url = var("WEBHOOK_URL");

        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            bail!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let webhook_port = match var("WEBHOOK_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("WEBHOOK_PORT is not a valid port: {raw}"))?,
            None => 8443,
        };

        let broadcast_concurrency = match var("BROADCAST_CONCURRENCY") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("BROADCAST_CONCURRENCY is not a number: {raw}"))?
                .max(1),
            None => DEFAULT_BROADCAST_CONCURRENCY,
        };

        let drive_write_mode = var("DRIVE_WRITE_MODE")
            .map(|m| DriveWriteMode::parse(&m))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            bot_token: var("BOT_TOKEN").context("BOT_TOKEN must be set")?,
            bot_mode,
            webhook_url,
            webhook_port,
            webhook_secret: var("WEBHOOK_SECRET"),
            mongodb_uri: var("MONGODB_URI").context("MONGODB_URI must be set")?,
            mongodb_database: var("MONGODB_DATABASE")
                .unwrap_or_else(|| "transmission_bot".to_string()),
            storage_channel_id: parse_chat_id(var("TELEGRAM_STORAGE_CHANNEL_ID"), "TELEGRAM_STORAGE_CHANNEL_ID")?,
            admin_channel_id: parse_chat_id(var("TELEGRAM_ADMIN_CHANNEL_ID"), "TELEGRAM_ADMIN_CHANNEL_ID")?,
            admin_channel_invite_link: var("TELEGRAM_ADMIN_CHANNEL_INVITE_PRIVATE_LINK")
                .unwrap_or_default(),
            broadcast_concurrency,
            drive_write_mode,
        })
    }
}

fn parse_chat_id(raw: Option<String>, key: &str) -> Result<Option<ChatId>> {
    raw.map(|v| {
        v.parse::<i64>()
            .map(ChatId)
            .with_context(|| format!("{key} must be a numeric chat id, got {v}"))
    })
    .transpose()
}

/// Immutable settings handed to the flow engine at construction.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub storage_channel_id: Option<ChatId>,
    pub admin_channel_id: Option<ChatId>,
    pub admin_channel_invite_link: String,
    /// Bot username (without @), used to strip `/command@bot` suffixes.
    pub bot_username: String,
    pub broadcast_concurrency: usize,
    pub drive_write_mode: DriveWriteMode,
}

impl FlowConfig {
    pub fn from_config(config: &Config, bot_username: impl Into<String>) -> Self {
        Self {
            storage_channel_id: config.storage_channel_id,
            admin_channel_id: config.admin_channel_id,
            admin_channel_invite_link: config.admin_channel_invite_link.clone(),
            bot_username: bot_username.into(),
            broadcast_concurrency: config.broadcast_concurrency.max(1),
            drive_write_mode: config.drive_write_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[("BOT_TOKEN", "t"), ("MONGODB_URI", "mongodb://localhost")]).unwrap();

        assert_eq!(config.bot_mode, BotMode::Polling);
        assert_eq!(config.mongodb_database, "transmission_bot");
        assert_eq!(config.webhook_port, 8443);
        assert_eq!(config.broadcast_concurrency, DEFAULT_BROADCAST_CONCURRENCY);
        assert!(config.storage_channel_id.is_none());
        assert!(config.admin_channel_id.is_none());
        assert_eq!(config.drive_write_mode, DriveWriteMode::Copy);
    }

    #[test]
    fn test_drive_write_mode() {
        let config = load(&[
            ("BOT_TOKEN", "t"),
            ("MONGODB_URI", "mongodb://localhost"),
            ("DRIVE_WRITE_MODE", "Forward"),
        ])
        .unwrap();
        assert_eq!(config.drive_write_mode, DriveWriteMode::Forward);

        let err = load(&[
            ("BOT_TOKEN", "t"),
            ("MONGODB_URI", "mongodb://localhost"),
            ("DRIVE_WRITE_MODE", "mirror"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("DRIVE_WRITE_MODE"));
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = load(&[("MONGODB_URI", "mongodb://localhost")]).unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_webhook_mode_requires_url() {
        let err = load(&[
            ("BOT_TOKEN", "t"),
            ("MONGODB_URI", "mongodb://localhost"),
            ("BOT_MODE", "Webhook"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("WEBHOOK_URL"));
    }

    #[test]
    fn test_channel_ids_are_parsed() {
        let config = load(&[
            ("BOT_TOKEN", "t"),
            ("MONGODB_URI", "mongodb://localhost"),
            ("TELEGRAM_STORAGE_CHANNEL_ID", "-1001234"),
            ("TELEGRAM_ADMIN_CHANNEL_ID", " -1005678 "),
            ("BROADCAST_CONCURRENCY", "0"),
        ])
        .unwrap();

        assert_eq!(config.storage_channel_id, Some(ChatId(-1001234)));
        assert_eq!(config.admin_channel_id, Some(ChatId(-1005678)));
        assert_eq!(config.broadcast_concurrency, 1);
    }

    #[test]
    fn test_bad_channel_id_is_rejected() {
        let err = load(&[
            ("BOT_TOKEN", "t"),
            ("MONGODB_URI", "mongodb://localhost"),
            ("TELEGRAM_ADMIN_CHANNEL_ID", "@mychannel"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_ADMIN_CHANNEL_ID"));
    }
}
