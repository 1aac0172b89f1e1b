//! User repository with cache-first upserts.
//!
//! Every update touches the sender's record; the cache lets unchanged
//! profiles skip the write.

use std::sync::Arc;

use anyhow::Result;
use mongodb::bson::doc;
use mongodb::Collection;
use teloxide::types::User;
use tokio::spawn;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use super::models::BotUser;
use super::mongo::USERS;
use super::Database;

/// Repository for user records.
#[derive(Clone)]
pub struct UserRepo {
    collection: Collection<BotUser>,
    cache: TypedCache<i64, BotUser>,
}

impl UserRepo {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection(USERS),
            cache: cache.get_or_create("users_by_id", CacheConfig::cold_data()),
        }
    }

    /// Upsert user data keyed by Telegram user id.
    pub async fn upsert(&self, user: &User) -> Result<()> {
        let user_id = user.id.0 as i64;

        // Skip unchanged profiles
        if let Some(cached) = self.cache.get(&user_id)
            && !cached.has_changed(user)
        {
            return Ok(());
        }

        let record = BotUser::from_telegram(user);
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.collection
            .replace_one(doc! { "user_id": user_id }, &record)
            .with_options(options)
            .await?;
        // Cache only what is stored.
        self.cache.insert(user_id, record.clone());

        debug!("Upserted user {} (@{:?})", user_id, record.username);
        Ok(())
    }

    /// Upsert user in background (non-blocking).
    pub fn upsert_background(self: Arc<Self>, user: User) {
        spawn(async move {
            if let Err(e) = self.upsert(&user).await {
                warn!("Failed to upsert user {}: {}", user.id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use mongodb::options::ClientOptions;
    use mongodb::Client;

    use super::*;

    fn user(first_name: &str) -> User {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "is_bot": false,
            "first_name": first_name,
        }))
        .unwrap()
    }

    async fn unreachable_db() -> Database {
        let options = ClientOptions::parse("mongodb://127.0.0.1:9/?serverSelectionTimeoutMS=50")
            .await
            .unwrap();
        Database::from_client(Client::with_options(options).unwrap(), "users_test")
    }

    #[tokio::test]
    async fn test_failed_write_is_not_cached() {
        let repo = UserRepo::new(&unreachable_db().await, &CacheRegistry::new());

        assert!(repo.upsert(&user("Ana")).await.is_err());
        assert!(repo.cache.get(&7).is_none());

        // The next update tries the write again.
        assert!(repo.upsert(&user("Ana")).await.is_err());
    }

    #[test]
    fn test_profile_change_is_detected() {
        let stored = BotUser::from_telegram(&user("Ana"));
        assert!(!stored.has_changed(&user("Ana")));
        assert!(stored.has_changed(&user("Bea")));
    }
}
