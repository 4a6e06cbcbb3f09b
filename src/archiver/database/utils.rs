use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::Row;

/// Parses an INTEGER timestamp column (milliseconds since the Unix epoch).
pub(crate) fn parse_timestamp<'r, R>(
    row: &'r R,
    column_name: &'r str,
) -> Result<DateTime<Utc>, sqlx::Error>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let timestamp_ms: i64 = row.try_get(column_name)?;
    DateTime::from_timestamp_millis(timestamp_ms)
        .ok_or_else(|| create_column_decode_error(column_name, "Invalid timestamp value"))
}

/// Parses a TEXT column holding the string form of a closed enum.
pub(crate) fn parse_text_column<'r, R, T>(row: &'r R, column_name: &'r str) -> Result<T, sqlx::Error>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(column_name)?;
    raw.parse::<T>()
        .map_err(|e| create_column_decode_error(column_name, &e.to_string()))
}

/// Deserializes a nullable JSON TEXT column.
pub(crate) fn parse_json_column<'r, R, T>(
    row: &'r R,
    column_name: &'r str,
) -> Result<Option<T>, sqlx::Error>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    T: DeserializeOwned,
{
    row.try_get::<Option<String>, _>(column_name)?
        .map(|json_str| {
            serde_json::from_str(&json_str).map_err(|e| sqlx::Error::ColumnDecode {
                index: column_name.to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}

/// Helper function to create consistent ColumnDecode errors.
pub(crate) fn create_column_decode_error(column_name: &str, message: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column_name.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            message.to_string(),
        )),
    }
}
