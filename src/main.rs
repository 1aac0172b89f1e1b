//! Transmission List Bot
//!
//! Telegram bot that broadcasts one stored message to named lists of
//! channels.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB models, repositories and storage traits
//! - `cache` - Moka-backed caches
//! - `permissions` - Bot rights and admin channel membership
//! - `flow` - Conversation state machine
//! - `broadcast` - Fan-out of a stored message to a list
//! - `bot` - Telegram transport, dispatcher and runtime (Throttle for rate limiting)
//! - `utils` - Utility functions

mod bot;
mod broadcast;
mod cache;
mod config;
mod database;
mod flow;
mod permissions;
mod utils;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::{AppState, TelegramApi};
use cache::CacheRegistry;
use config::{Config, FlowConfig};
use database::{Database, ListRepository, StateRepository, UserRepo};
use flow::{Command, FlowEngine};
use permissions::Permissions;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// How often unused per-user locks are dropped.
const LOCK_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("transmission_bot=info,teloxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting transmission bot...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Bot mode: {:?}", config.bot_mode);
    if config.storage_channel_id.is_none() {
        warn!("TELEGRAM_STORAGE_CHANNEL_ID is not set; sending will be refused");
    }
    if config.admin_channel_id.is_none() {
        warn!("TELEGRAM_ADMIN_CHANNEL_ID is not set; every user will be denied");
    }

    // Connect to MongoDB
    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;
    info!("Database connected");

    let cache = CacheRegistry::new();

    // Throttle respects Telegram's rate limits:
    // - 30 messages per second globally
    // - 1 message per second to the same chat
    // - 20 messages per minute to the same group
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    // Identity is resolved once; permission checks match on the bot's id.
    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    bot.set_my_commands(Command::bot_commands()).await?;

    let api = Arc::new(TelegramApi::new(bot.clone()));
    let permissions = Permissions::new(api.clone(), me.id, &cache);
    let engine = Arc::new(FlowEngine::new(
        api,
        Arc::new(StateRepository::new(&db, &cache)),
        Arc::new(ListRepository::new(&db)),
        permissions,
        FlowConfig::from_config(&config, me.username()),
    ));

    {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOCK_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                engine.forget_idle_locks();
            }
        });
    }

    let state = AppState {
        engine,
        users: Arc::new(UserRepo::new(&db, &cache)),
    };
    info!("{} caches registered", cache.len());
    let dispatcher = bot::build_dispatcher(bot.clone(), state);

    bot::run(&config, bot, dispatcher).await
}
