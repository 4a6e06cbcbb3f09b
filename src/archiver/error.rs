use thiserror::Error;

use crate::archiver::database::DatabaseError;

pub type Result<T> = core::result::Result<T, ArchiverError>;

#[derive(Error, Debug)]
pub enum ArchiverError {
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Media download error: {0}")]
    MediaDownload(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}
