use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqliteExecutor;

use super::{
    utils::{parse_json_column, parse_timestamp},
    chats::upsert_chat,
    users::upsert_user,
    Database, DatabaseError,
};
use crate::types::{Chat, User};

pub const MEMBER_JOINED: &str = "member_joined";
pub const MEMBER_LEFT: &str = "member_left";
pub const TITLE_CHANGED: &str = "title_changed";
pub const MESSAGE_PINNED: &str = "message_pinned";

/// Payload of `member_joined` and `member_left` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPayload {
    pub username: Option<String>,
    pub first_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleChangedPayload {
    pub new_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePinnedPayload {
    pub pinned_message_id: i64,
}

/// Event type together with its type-specific payload.
///
/// Types this crate does not know are kept verbatim with an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    MemberJoined(MemberPayload),
    MemberLeft(MemberPayload),
    TitleChanged(TitleChangedPayload),
    MessagePinned(MessagePinnedPayload),
    Other {
        event_type: String,
        payload: Map<String, Value>,
    },
}

impl EventKind {
    pub fn event_type(&self) -> &str {
        match self {
            EventKind::MemberJoined(_) => MEMBER_JOINED,
            EventKind::MemberLeft(_) => MEMBER_LEFT,
            EventKind::TitleChanged(_) => TITLE_CHANGED,
            EventKind::MessagePinned(_) => MESSAGE_PINNED,
            EventKind::Other { event_type, .. } => event_type,
        }
    }

    /// The payload as a JSON object.
    pub fn payload(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let value = match self {
            EventKind::MemberJoined(payload) | EventKind::MemberLeft(payload) => {
                serde_json::to_value(payload)?
            }
            EventKind::TitleChanged(payload) => serde_json::to_value(payload)?,
            EventKind::MessagePinned(payload) => serde_json::to_value(payload)?,
            EventKind::Other { payload, .. } => return Ok(payload.clone()),
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Rebuilds a kind from its stored type and payload.
    ///
    /// A known type whose payload does not match its documented shape is kept as `Other`.
    pub fn from_parts(event_type: String, payload: Map<String, Value>) -> Self {
        let value = Value::Object(payload.clone());
        let parsed = match event_type.as_str() {
            MEMBER_JOINED => serde_json::from_value(value).map(EventKind::MemberJoined).ok(),
            MEMBER_LEFT => serde_json::from_value(value).map(EventKind::MemberLeft).ok(),
            TITLE_CHANGED => serde_json::from_value(value).map(EventKind::TitleChanged).ok(),
            MESSAGE_PINNED => serde_json::from_value(value).map(EventKind::MessagePinned).ok(),
            _ => None,
        };
        parsed.unwrap_or(EventKind::Other {
            event_type,
            payload,
        })
    }
}

/// Everything the core supplies for one non-message occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub chat_id: i64,
    /// The member concerned or the acting user, when known.
    pub user_id: Option<i64>,
    pub kind: EventKind,
    pub date: DateTime<Utc>,
}

/// The rows of one service update, persisted all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceWrite {
    /// Chat as it stands after the update, title changes applied.
    pub chat: Chat,
    /// Acting user and members concerned.
    pub users: Vec<User>,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub id: i64,
    pub record: EventRecord,
    pub created_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for EventRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> std::result::Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let event_type: String = row.try_get("type")?;
        let payload: Option<Map<String, Value>> = parse_json_column(row, "data")?;

        let record = EventRecord {
            chat_id: row.try_get("chat_id")?,
            user_id: row.try_get("user_id")?,
            kind: EventKind::from_parts(event_type, payload.unwrap_or_default()),
            date: parse_timestamp(row, "date")?,
        };

        Ok(EventRow {
            id,
            record,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

impl Database {
    /// Appends one event row and returns its surrogate id.
    pub(crate) async fn insert_event(&self, record: &EventRecord) -> Result<i64, DatabaseError> {
        insert_event_row(&self.pool, record).await
    }

    /// Writes a service update's chat, users and events in one transaction.
    ///
    /// Either every row lands or none does. Returns the event ids in input order.
    pub(crate) async fn save_service_write(
        &self,
        write: &ServiceWrite,
    ) -> Result<Vec<i64>, DatabaseError> {
        let mut txn = self.pool.begin().await?;

        upsert_chat(&mut *txn, &write.chat).await?;
        for user in &write.users {
            upsert_user(&mut *txn, user).await?;
        }
        let mut event_ids = Vec::with_capacity(write.events.len());
        for record in &write.events {
            event_ids.push(insert_event_row(&mut *txn, record).await?);
        }

        txn.commit().await?;
        Ok(event_ids)
    }

    pub async fn events_in_chat(&self, chat_id: i64) -> Result<Vec<EventRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, chat_id, user_id, type, data, date, created_at
             FROM events
             WHERE chat_id = ?
             ORDER BY id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn insert_event_row<'e, E>(executor: E, record: &EventRecord) -> Result<i64, DatabaseError>
where
    E: SqliteExecutor<'e>,
{
    let payload = record.kind.payload()?;
    let data = if payload.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&payload)?)
    };

    let result = sqlx::query(
        "INSERT INTO events (chat_id, user_id, type, data, date, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(record.chat_id)
    .bind(record.user_id)
    .bind(record.kind.event_type())
    .bind(data)
    .bind(record.date.timestamp_millis())
    .bind(Utc::now().timestamp_millis())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}
