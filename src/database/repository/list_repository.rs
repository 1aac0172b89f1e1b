//! Transmission list repository.
//!
//! Lists, channels and messages live in three collections. MongoDB has no
//! foreign keys, so the list -> channels cascade is done here.

use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::Collection;
use tracing::{debug, info};

use crate::database::models::{
    MessageStatus, NewChannel, NewMessage, TransmissionList, TransmissionListChannel,
    TransmissionListMessage,
};
use crate::database::mongo::{LISTS, LIST_CHANNELS, LIST_MESSAGES};
use crate::database::store::{AddChannel, ListStore};
use crate::database::Database;

/// MongoDB duplicate key error code.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed [`ListStore`].
pub struct ListRepository {
    db: Database,
    lists: Collection<TransmissionList>,
    channels: Collection<TransmissionListChannel>,
    messages: Collection<TransmissionListMessage>,
}

impl ListRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            lists: db.collection(LISTS),
            channels: db.collection(LIST_CHANNELS),
            messages: db.collection(LIST_MESSAGES),
        }
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl ListStore for ListRepository {
    async fn create_list(&self, owner_id: i64, name: &str) -> Result<TransmissionList> {
        let id = self.db.next_id(LISTS).await?;
        let list = TransmissionList::new(id, owner_id, name);
        self.lists.insert_one(&list).await?;
        info!("Created list {} ({:?}) for user {}", id, name, owner_id);
        Ok(list)
    }

    async fn find_list(&self, owner_id: i64, list_id: i64) -> Result<Option<TransmissionList>> {
        let filter = doc! { "id": list_id, "owner_id": owner_id };
        Ok(self.lists.find_one(filter).await?)
    }

    async fn lists_for_owner(&self, owner_id: i64) -> Result<Vec<TransmissionList>> {
        let options = mongodb::options::FindOptions::builder()
            .sort(doc! { "id": 1 })
            .build();
        let cursor = self
            .lists
            .find(doc! { "owner_id": owner_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn rename_list(&self, list_id: i64, name: &str) -> Result<bool> {
        let update = doc! {
            "$set": { "name": name, "updated_at": chrono::Utc::now().timestamp() }
        };
        let result = self.lists.update_one(doc! { "id": list_id }, update).await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_list(&self, list_id: i64) -> Result<Option<TransmissionList>> {
        let Some(list) = self.lists.find_one_and_delete(doc! { "id": list_id }).await? else {
            return Ok(None);
        };

        let removed = self
            .channels
            .delete_many(doc! { "transmission_list_id": list_id })
            .await?;

        // Messages outlive their list.
        self.messages
            .update_many(
                doc! { "transmission_list_id": list_id },
                doc! { "$set": { "transmission_list_id": mongodb::bson::Bson::Null } },
            )
            .await?;

        info!(
            "Deleted list {} and {} channel(s)",
            list_id, removed.deleted_count
        );
        Ok(Some(list))
    }

    async fn channel_exists(&self, list_id: i64, chat_id: i64) -> Result<bool> {
        let filter = doc! { "transmission_list_id": list_id, "chat_id": chat_id };
        Ok(self.channels.count_documents(filter).await? > 0)
    }

    async fn add_channel(&self, list_id: i64, channel: NewChannel) -> Result<AddChannel> {
        let id = self.db.next_id(LIST_CHANNELS).await?;
        let record = TransmissionListChannel {
            id,
            transmission_list_id: list_id,
            chat_id: channel.chat_id,
            chat_name: channel.chat_name,
            username: channel.username,
            kind: channel.kind,
            created_at: chrono::Utc::now().timestamp(),
        };

        match self.channels.insert_one(&record).await {
            Ok(_) => {
                debug!("Added chat {} to list {}", record.chat_id, list_id);
                Ok(AddChannel::Added(record))
            }
            // Lost a race against an identical insert
            Err(e) if is_duplicate_key(&e) => Ok(AddChannel::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn count_channels(&self, list_id: i64) -> Result<u64> {
        Ok(self
            .channels
            .count_documents(doc! { "transmission_list_id": list_id })
            .await?)
    }

    async fn channels(&self, list_id: i64) -> Result<Vec<TransmissionListChannel>> {
        let cursor = self
            .channels
            .find(doc! { "transmission_list_id": list_id })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_channel(&self, channel_id: i64) -> Result<Option<TransmissionListChannel>> {
        Ok(self.channels.find_one(doc! { "id": channel_id }).await?)
    }

    async fn delete_channel(&self, channel_id: i64) -> Result<bool> {
        let result = self.channels.delete_one(doc! { "id": channel_id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn create_message(&self, message: NewMessage) -> Result<TransmissionListMessage> {
        let id = self.db.next_id(LIST_MESSAGES).await?;
        let now = chrono::Utc::now().timestamp();
        let record = TransmissionListMessage {
            id,
            owner_id: message.owner_id,
            transmission_list_id: Some(message.transmission_list_id),
            drive_chat_id: message.drive_chat_id,
            drive_message_id: message.drive_message_id,
            status: MessageStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.messages.insert_one(&record).await?;
        Ok(record)
    }

    async fn find_message(
        &self,
        owner_id: i64,
        message_id: i64,
    ) -> Result<Option<TransmissionListMessage>> {
        let filter = doc! { "id": message_id, "owner_id": owner_id };
        Ok(self.messages.find_one(filter).await?)
    }

    async fn set_message_status(&self, message_id: i64, status: MessageStatus) -> Result<()> {
        let update = doc! {
            "$set": {
                "status": status.as_str(),
                "updated_at": chrono::Utc::now().timestamp(),
            }
        };
        self.messages
            .update_one(doc! { "id": message_id }, update)
            .await?;
        debug!("Message {} status -> {}", message_id, status.as_str());
        Ok(())
    }

    async fn delete_message(&self, message_id: i64) -> Result<bool> {
        let result = self.messages.delete_one(doc! { "id": message_id }).await?;
        Ok(result.deleted_count > 0)
    }
}
