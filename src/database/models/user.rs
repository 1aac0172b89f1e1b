//! User record, upserted from every inbound update.

use serde::{Deserialize, Serialize};
use teloxide::types::User;

/// Telegram user as stored in the `users` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BotUser {
    /// Telegram user ID.
    pub user_id: i64,
    /// Username without @ (lowercase for matching).
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    /// Unix timestamp of last interaction.
    pub updated_at: i64,
}

impl BotUser {
    /// Create a new BotUser from a Telegram User.
    pub fn from_telegram(user: &User) -> Self {
        Self {
            user_id: user.id.0 as i64,
            username: user.username.as_ref().map(|u| u.to_lowercase()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            language_code: user.language_code.clone(),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Check if the profile differs from a fresh Telegram user object.
    pub fn has_changed(&self, other: &User) -> bool {
        let new_username = other.username.as_ref().map(|u| u.to_lowercase());
        self.username != new_username
            || self.first_name != other.first_name
            || self.last_name != other.last_name
            || self.language_code != other.language_code
    }
}
