use async_trait::async_trait;

use crate::archiver::database::{
    events::{EventRecord, ServiceWrite},
    messages::MessageRecord,
    Database, DatabaseError,
};
use crate::types::{Chat, User};

/// Persistence boundary used by the update pipeline.
///
/// The store only persists rows; required-field presence and entity ordering are
/// enforced by the caller.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert the chat, or overwrite its mutable fields and bump `updated_at`.
    async fn upsert_chat(&self, chat: &Chat) -> Result<(), DatabaseError>;

    /// Insert the user, or overwrite its mutable fields and bump `updated_at`.
    async fn upsert_user(&self, user: &User) -> Result<(), DatabaseError>;

    /// Append a message row, returning its surrogate id.
    async fn append_message(&self, record: &MessageRecord) -> Result<i64, DatabaseError>;

    /// Append an event row, returning its surrogate id.
    async fn append_event(&self, record: &EventRecord) -> Result<i64, DatabaseError>;

    /// Upsert the chat and users, then append the events, as one unit.
    ///
    /// On error nothing of the write is persisted. Returns the event ids in input order.
    async fn append_service(&self, write: &ServiceWrite) -> Result<Vec<i64>, DatabaseError>;

    /// Whether a non-edit message row exists for (chat, message number).
    async fn has_original_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
impl Store for Database {
    async fn upsert_chat(&self, chat: &Chat) -> Result<(), DatabaseError> {
        self.save_chat(chat).await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.save_user(user).await
    }

    async fn append_message(&self, record: &MessageRecord) -> Result<i64, DatabaseError> {
        self.insert_message(record).await
    }

    async fn append_event(&self, record: &EventRecord) -> Result<i64, DatabaseError> {
        self.insert_event(record).await
    }

    async fn append_service(&self, write: &ServiceWrite) -> Result<Vec<i64>, DatabaseError> {
        self.save_service_write(write).await
    }

    async fn has_original_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<bool, DatabaseError> {
        Database::has_original_message(self, chat_id, message_id).await
    }
}
