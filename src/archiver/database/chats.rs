use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::{
    utils::{parse_text_column, parse_timestamp},
    Database, DatabaseError,
};
use crate::types::{Chat, ChatKind};

/// A chat dimension row as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRow {
    pub chat: Chat,
    /// Last time the chat was seen in any update.
    pub updated_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for ChatRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> std::result::Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("chat_id")?;
        let title: Option<String> = row.try_get("title")?;
        let kind: ChatKind = parse_text_column(row, "type")?;
        let updated_at = parse_timestamp(row, "updated_at")?;

        Ok(ChatRow {
            chat: Chat { id, title, kind },
            updated_at,
        })
    }
}

impl Database {
    /// Inserts the chat or overwrites its title and kind.
    ///
    /// `updated_at` is bumped on every call, including calls with unchanged data,
    /// but never moves backwards.
    pub(crate) async fn save_chat(&self, chat: &Chat) -> Result<(), DatabaseError> {
        upsert_chat(&self.pool, chat).await
    }

    pub async fn find_chat(&self, chat_id: i64) -> Result<Option<ChatRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT chat_id, title, type, updated_at FROM chats WHERE chat_id = ?",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

pub(super) async fn upsert_chat<'e, E>(executor: E, chat: &Chat) -> Result<(), DatabaseError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO chats (chat_id, title, type, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(chat_id) DO UPDATE SET
           title = excluded.title,
           type = excluded.type,
           updated_at = MAX(chats.updated_at, excluded.updated_at)",
    )
    .bind(chat.id)
    .bind(chat.title.as_deref())
    .bind(chat.kind.as_str())
    .bind(Utc::now().timestamp_millis())
    .execute(executor)
    .await?;
    Ok(())
}
