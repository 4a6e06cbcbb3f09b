use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    utils::{parse_json_column, parse_text_column, parse_timestamp},
    Database, DatabaseError,
};

/// Closed set of classified message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    VideoNote,
    Sticker,
    Animation,
    Other,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Photo => "photo",
            MessageType::Video => "video",
            MessageType::Document => "document",
            MessageType::Audio => "audio",
            MessageType::Voice => "voice",
            MessageType::VideoNote => "video_note",
            MessageType::Sticker => "sticker",
            MessageType::Animation => "animation",
            MessageType::Other => "other",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "photo" => Ok(MessageType::Photo),
            "video" => Ok(MessageType::Video),
            "document" => Ok(MessageType::Document),
            "audio" => Ok(MessageType::Audio),
            "voice" => Ok(MessageType::Voice),
            "video_note" => Ok(MessageType::VideoNote),
            "sticker" => Ok(MessageType::Sticker),
            "animation" => Ok(MessageType::Animation),
            "other" => Ok(MessageType::Other),
            other => Err(format!("unknown message type: {other}")),
        }
    }
}

/// Sparse media attributes stored as JSON in `messages.media_meta`.
///
/// Each builder method drops values that are absent or default (zero, empty string),
/// so the serialized map only carries meaningful keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct MediaAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Diameter of a round video note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_name: Option<String>,
}

fn non_zero_u32(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

impl MediaAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size.filter(|s| *s > 0);
        self
    }

    pub fn with_mime(mut self, mime: Option<&str>) -> Self {
        self.mime = non_empty(mime);
        self
    }

    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = non_empty(name);
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = non_zero_u32(duration);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = non_zero_u32(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = non_zero_u32(height);
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = non_zero_u32(length);
        self
    }

    pub fn with_emoji(mut self, emoji: Option<&str>) -> Self {
        self.emoji = non_empty(emoji);
        self
    }

    pub fn with_set_name(mut self, set_name: Option<&str>) -> Self {
        self.set_name = non_empty(set_name);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `None` when no attribute survived, so empty maps are stored as NULL.
    pub fn into_non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

/// Everything the core supplies for one observed message instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub message_id: i64,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub message_type: MessageType,
    /// Raw text, media caption, or the content-kind name for unmodeled content.
    pub text: Option<String>,
    pub media_file_id: Option<String>,
    pub media_meta: Option<MediaAttributes>,
    pub reply_to: Option<i64>,
    pub fwd_from: Option<i64>,
    pub fwd_name: Option<String>,
    pub is_edit: bool,
}

/// A persisted message: the written record plus store-assigned fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: i64,
    pub record: MessageRecord,
    pub created_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for MessageRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> std::result::Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let is_edit: i64 = row.try_get("is_edit")?;

        let record = MessageRecord {
            message_id: row.try_get("msg_id")?,
            chat_id: row.try_get("chat_id")?,
            user_id: row.try_get("user_id")?,
            date: parse_timestamp(row, "date")?,
            message_type: parse_text_column(row, "type")?,
            text: row.try_get("text")?,
            media_file_id: row.try_get("media_file_id")?,
            media_meta: parse_json_column(row, "media_meta")?,
            reply_to: row.try_get("reply_to")?,
            fwd_from: row.try_get("fwd_from")?,
            fwd_name: row.try_get("fwd_name")?,
            is_edit: is_edit != 0,
        };

        Ok(MessageRow {
            id,
            record,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

impl Database {
    /// Appends one message row and returns its surrogate id.
    pub(crate) async fn insert_message(
        &self,
        record: &MessageRecord,
    ) -> Result<i64, DatabaseError> {
        let media_meta = record
            .media_meta
            .as_ref()
            .filter(|meta| !meta.is_empty())
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "INSERT INTO messages
             (msg_id, chat_id, user_id, date, type, text, media_file_id,
              media_meta, reply_to, fwd_from, fwd_name, is_edit, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.message_id)
        .bind(record.chat_id)
        .bind(record.user_id)
        .bind(record.date.timestamp_millis())
        .bind(record.message_type.as_str())
        .bind(record.text.as_deref())
        .bind(record.media_file_id.as_deref())
        .bind(media_meta)
        .bind(record.reply_to)
        .bind(record.fwd_from)
        .bind(record.fwd_name.as_deref())
        .bind(record.is_edit)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Whether a non-edit row exists for this (chat, message number).
    pub(crate) async fn has_original_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<bool, DatabaseError> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM messages WHERE msg_id = ? AND chat_id = ? AND is_edit = 0
             )",
        )
        .bind(message_id)
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    /// All rows of a chat in ingestion order.
    pub async fn messages_in_chat(&self, chat_id: i64) -> Result<Vec<MessageRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, msg_id, chat_id, user_id, date, type, text, media_file_id,
                    media_meta, reply_to, fwd_from, fwd_name, is_edit, created_at
             FROM messages
             WHERE chat_id = ?
             ORDER BY id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::database::test_support::create_test_db;
    use crate::types::{Chat, ChatKind, User};
    use chrono::TimeZone;

    async fn seed_chat_and_user(db: &Database) {
        db.save_chat(&Chat {
            id: -1001,
            title: Some("Chat".to_string()),
            kind: ChatKind::Group,
        })
        .await
        .unwrap();
        db.save_user(&User {
            id: 100,
            username: Some("user".to_string()),
            first_name: "First".to_string(),
            last_name: Some("Last".to_string()),
        })
        .await
        .unwrap();
    }

    fn text_record(message_id: i64, text: &str) -> MessageRecord {
        MessageRecord {
            message_id,
            chat_id: -1001,
            user_id: Some(100),
            date: Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap(),
            message_type: MessageType::Text,
            text: Some(text.to_string()),
            media_file_id: None,
            media_meta: None,
            reply_to: None,
            fwd_from: None,
            fwd_name: None,
            is_edit: false,
        }
    }

    #[test]
    fn test_media_attributes_skip_default_values() {
        let attributes = MediaAttributes::new()
            .with_size(Some(100))
            .with_mime(Some("video/mp4"))
            .with_name(None)
            .with_duration(30)
            .with_width(0)
            .with_emoji(Some(""));

        let json = serde_json::to_value(&attributes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "size": 100, "mime": "video/mp4", "duration": 30 })
        );
    }

    #[test]
    fn test_media_attributes_zero_size_is_absent() {
        let attributes = MediaAttributes::new().with_size(Some(0));
        assert!(attributes.is_empty());
        assert!(attributes.into_non_empty().is_none());
    }

    #[test]
    fn test_message_type_round_trips_through_str() {
        for message_type in [
            MessageType::Text,
            MessageType::Photo,
            MessageType::Video,
            MessageType::Document,
            MessageType::Audio,
            MessageType::Voice,
            MessageType::VideoNote,
            MessageType::Sticker,
            MessageType::Animation,
            MessageType::Other,
        ] {
            assert_eq!(message_type.as_str().parse::<MessageType>(), Ok(message_type));
        }
    }

    #[tokio::test]
    async fn test_insert_message_round_trip() {
        let (db, _temp_dir) = create_test_db().await;
        seed_chat_and_user(&db).await;

        let record = MessageRecord {
            message_type: MessageType::Photo,
            text: Some("Caption".to_string()),
            media_file_id: Some("abc123".to_string()),
            media_meta: Some(
                MediaAttributes::new()
                    .with_size(Some(12345))
                    .with_width(800)
                    .with_height(600),
            ),
            reply_to: Some(3),
            fwd_from: Some(200),
            fwd_name: Some("Forwarded User".to_string()),
            ..text_record(2, "ignored")
        };

        let id = db.insert_message(&record).await.unwrap();

        let rows = db.messages_in_chat(-1001).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].record, record);
    }

    #[tokio::test]
    async fn test_insert_message_stores_sparse_json() {
        let (db, _temp_dir) = create_test_db().await;
        seed_chat_and_user(&db).await;

        let record = MessageRecord {
            message_type: MessageType::Video,
            media_meta: Some(
                MediaAttributes::new()
                    .with_size(Some(100))
                    .with_mime(Some("video/mp4"))
                    .with_name(None)
                    .with_duration(30),
            ),
            ..text_record(3, "clip")
        };
        db.insert_message(&record).await.unwrap();

        let (raw,): (String,) = sqlx::query_as("SELECT media_meta FROM messages WHERE msg_id = 3")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(parsed.get("name").is_none());
        assert_eq!(parsed["duration"], 30);
    }

    #[tokio::test]
    async fn test_insert_message_empty_media_meta_is_null() {
        let (db, _temp_dir) = create_test_db().await;
        seed_chat_and_user(&db).await;

        let record = MessageRecord {
            media_meta: Some(MediaAttributes::new()),
            ..text_record(4, "nothing")
        };
        db.insert_message(&record).await.unwrap();

        let (raw,): (Option<String>,) =
            sqlx::query_as("SELECT media_meta FROM messages WHERE msg_id = 4")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert!(raw.is_none());
    }

    #[tokio::test]
    async fn test_insert_message_without_user() {
        let (db, _temp_dir) = create_test_db().await;
        seed_chat_and_user(&db).await;

        let record = MessageRecord {
            user_id: None,
            ..text_record(1, "Channel post")
        };
        db.insert_message(&record).await.unwrap();

        let rows = db.messages_in_chat(-1001).await.unwrap();
        assert_eq!(rows[0].record.user_id, None);
    }

    #[tokio::test]
    async fn test_insert_message_requires_existing_chat() {
        let (db, _temp_dir) = create_test_db().await;

        let result = db.insert_message(&text_record(1, "orphan")).await;
        assert!(matches!(result, Err(DatabaseError::Sqlx(_))));
    }

    #[tokio::test]
    async fn test_messages_are_append_only() {
        let (db, _temp_dir) = create_test_db().await;
        seed_chat_and_user(&db).await;
        db.insert_message(&text_record(1, "Hello")).await.unwrap();

        let update = sqlx::query("UPDATE messages SET text = 'changed' WHERE msg_id = 1")
            .execute(&db.pool)
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM messages WHERE msg_id = 1")
            .execute(&db.pool)
            .await;
        assert!(delete.is_err());

        let rows = db.messages_in_chat(-1001).await.unwrap();
        assert_eq!(rows[0].record.text.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_has_original_message_ignores_edits() {
        let (db, _temp_dir) = create_test_db().await;
        seed_chat_and_user(&db).await;

        let edit = MessageRecord {
            is_edit: true,
            ..text_record(9, "edited")
        };
        db.insert_message(&edit).await.unwrap();
        assert!(!db.has_original_message(-1001, 9).await.unwrap());

        db.insert_message(&text_record(9, "original")).await.unwrap();
        assert!(db.has_original_message(-1001, 9).await.unwrap());
        assert!(!db.has_original_message(-2002, 9).await.unwrap());
    }
}
