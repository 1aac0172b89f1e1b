//! MongoDB database wrapper.

use anyhow::{Context, Result};
use mongodb::bson::{doc, Document};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

pub const USERS: &str = "users";
pub const USER_STATES: &str = "user_states";
pub const LISTS: &str = "transmission_lists";
pub const LIST_CHANNELS: &str = "transmission_list_channels";
pub const LIST_MESSAGES: &str = "transmission_list_messages";
const COUNTERS: &str = "counters";

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Wrap a client without the connection check.
    #[cfg(test)]
    pub fn from_client(client: Client, db_name: &str) -> Self {
        Self {
            db: client.database(db_name),
        }
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Allocate the next integer id for `sequence`.
    ///
    /// Ids are short enough to travel inside callback data.
    pub async fn next_id(&self, sequence: &str) -> Result<i64> {
        let counters: Collection<Document> = self.collection(COUNTERS);
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = counters
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "seq": 1_i64 } })
            .with_options(options)
            .await?
            .with_context(|| format!("counter {sequence} was not returned after upsert"))?;

        Ok(counter.get_i64("seq")?)
    }

    /// Create the unique indexes backing the data-model invariants.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        let specs: [(&str, Document, bool); 8] = [
            (USERS, doc! { "user_id": 1 }, true),
            (USER_STATES, doc! { "user_id": 1 }, true),
            (LISTS, doc! { "id": 1 }, true),
            (LISTS, doc! { "owner_id": 1 }, false),
            (LIST_CHANNELS, doc! { "id": 1 }, true),
            (LIST_CHANNELS, doc! { "transmission_list_id": 1, "chat_id": 1 }, true),
            (LIST_MESSAGES, doc! { "drive_message_id": 1 }, true),
            (LIST_MESSAGES, doc! { "id": 1 }, true),
        ];

        for (collection, keys, is_unique) in specs {
            let model = if is_unique {
                IndexModel::builder().keys(keys).options(unique()).build()
            } else {
                IndexModel::builder().keys(keys).build()
            };
            self.collection::<Document>(collection)
                .create_index(model)
                .await
                .with_context(|| format!("creating index on {collection}"))?;
        }

        info!("Database indexes ensured");
        Ok(())
    }
}
