use chrono::{DateTime, Utc};

use sqlx::SqliteExecutor;

use super::{utils::parse_timestamp, Database, DatabaseError};
use crate::types::User;

/// A user dimension row as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user: User,
    pub updated_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for UserRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> std::result::Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("user_id")?;
        let username: Option<String> = row.try_get("username")?;
        let first_name: String = row.try_get("first_name")?;
        let last_name: Option<String> = row.try_get("last_name")?;
        let updated_at = parse_timestamp(row, "updated_at")?;

        Ok(UserRow {
            user: User {
                id,
                username,
                first_name,
                last_name,
            },
            updated_at,
        })
    }
}

impl Database {
    /// Inserts the user or overwrites every name field ("last seen wins").
    pub(crate) async fn save_user(&self, user: &User) -> Result<(), DatabaseError> {
        upsert_user(&self.pool, user).await
    }

    pub async fn find_user(&self, user_id: i64) -> Result<Option<UserRow>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, first_name, last_name, updated_at
             FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

pub(super) async fn upsert_user<'e, E>(executor: E, user: &User) -> Result<(), DatabaseError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO users (user_id, username, first_name, last_name, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
           username = excluded.username,
           first_name = excluded.first_name,
           last_name = excluded.last_name,
           updated_at = MAX(users.updated_at, excluded.updated_at)",
    )
    .bind(user.id)
    .bind(user.username.as_deref())
    .bind(&user.first_name)
    .bind(user.last_name.as_deref())
    .bind(Utc::now().timestamp_millis())
    .execute(executor)
    .await?;
    Ok(())
}
