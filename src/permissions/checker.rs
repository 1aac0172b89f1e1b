//! Permission checker with a short-lived membership cache.

use std::sync::Arc;
use std::time::Duration;

use teloxide::types::{ChatId, UserId};
use tracing::{debug, error, warn};

use crate::bot::transport::BotApi;
use crate::cache::{CacheConfig, CacheRegistry, TypedCache};

/// How long a positive membership answer is trusted.
const MEMBERSHIP_TTL: Duration = Duration::from_secs(60);

/// The bot's rights in a target chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotPermissions {
    pub is_admin: bool,
    pub can_post: bool,
}

/// Cache key for membership lookups.
type MemberCacheKey = (i64, u64); // (chat_id, user_id)

/// Permission checker.
///
/// Only positive membership results are cached; a denial is re-checked on the
/// next update so a user who just joined gets in immediately.
#[derive(Clone)]
pub struct Permissions {
    api: Arc<dyn BotApi>,
    /// Identity of the bot itself, resolved once via getMe.
    bot_id: UserId,
    members: TypedCache<MemberCacheKey, ()>,
}

impl Permissions {
    pub fn new(api: Arc<dyn BotApi>, bot_id: UserId, cache: &CacheRegistry) -> Self {
        let members = cache.get_or_create(
            "admin_channel_members",
            CacheConfig::short_lived(MEMBERSHIP_TTL),
        );
        Self { api, bot_id, members }
    }

    /// Check whether the bot is an administrator of `chat_id` and may post.
    ///
    /// Never fails: an API error (typically "bot is not a member") is logged
    /// and reported as no rights at all.
    pub async fn check_bot_permissions(&self, chat_id: ChatId) -> BotPermissions {
        let admins = match self.api.chat_administrators(chat_id).await {
            Ok(admins) => admins,
            Err(e) => {
                error!("Failed to check bot permissions in chat {}: {}", chat_id, e);
                return BotPermissions::default();
            }
        };

        let rights = admins
            .iter()
            .find(|admin| admin.user_id == self.bot_id)
            .map(|admin| BotPermissions {
                is_admin: true,
                can_post: admin.can_post_messages,
            })
            .unwrap_or_default();

        debug!("Bot rights in chat {}: {:?}", chat_id, rights);
        rights
    }

    /// Check whether `user_id` is subscribed to the admin channel.
    ///
    /// An unconfigured admin channel or a failed lookup answers `false`.
    pub async fn is_channel_member(&self, admin_channel: Option<ChatId>, user_id: UserId) -> bool {
        let Some(channel) = admin_channel else {
            warn!("Admin channel is not configured; denying user {}", user_id);
            return false;
        };

        let key = (channel.0, user_id.0);
        if self.members.get(&key).is_some() {
            return true;
        }

        match self.api.chat_member_status(channel, user_id).await {
            Ok(status) => {
                debug!("User {} status in admin channel {}: {:?}", user_id, channel, status);
                let subscribed = status.is_subscribed();
                if subscribed {
                    self.members.insert(key, ());
                }
                subscribed
            }
            Err(e) => {
                error!(
                    "Failed to check subscription of user {} in admin channel {}: {}",
                    user_id, channel, e
                );
                false
            }
        }
    }
}
