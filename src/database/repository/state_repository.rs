//! User state repository with session caching.
//!
//! States are read on every update and written on every transition, so they
//! are kept hot in a TTI cache. Writes go to MongoDB first, then the cache.

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::Collection;
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::models::{FlowState, UserState};
use crate::database::mongo::USER_STATES;
use crate::database::store::StateStore;
use crate::database::Database;

/// MongoDB-backed [`StateStore`].
pub struct StateRepository {
    collection: Collection<UserState>,
    cache: TypedCache<i64, UserState>,
}

impl StateRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection(USER_STATES),
            cache: cache.get_or_create("user_states", CacheConfig::session_data()),
        }
    }
}

#[async_trait]
impl StateStore for StateRepository {
    async fn get(&self, user_id: i64) -> Result<Option<UserState>> {
        if let Some(state) = self.cache.get(&user_id) {
            return Ok(Some(state));
        }

        let result = self.collection.find_one(doc! { "user_id": user_id }).await?;

        if let Some(state) = &result {
            self.cache.insert(user_id, state.clone());
        }

        Ok(result)
    }

    async fn upsert(&self, user_id: i64, state: FlowState) -> Result<()> {
        let record = UserState::new(user_id, state);
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        let result = self
            .collection
            .replace_one(doc! { "user_id": user_id }, &record)
            .with_options(options)
            .await;

        if let Err(e) = result {
            // The cached copy may no longer match the database
            self.cache.invalidate(&user_id);
            return Err(e.into());
        }

        debug!("User {} state -> {}", user_id, record.state.name());
        self.cache.insert(user_id, record);
        Ok(())
    }
}
