use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

pub mod database;
mod entities;
pub mod error;
pub mod event_processor;
pub mod forward_origin;
pub mod media;
pub mod store;

use crate::init_tracing;
use database::Database;
use error::{ArchiverError, Result};
use media::download::MediaDownloader;
use store::Store;

const DEFAULT_DATA_DIR: &str = "./data";
const DB_FILE_NAME: &str = "archive.sqlite";
const MEDIA_DIR_NAME: &str = "media";
const LOGS_DIR_NAME: &str = "logs";

#[derive(Clone)]
pub struct ArchiverConfig {
    /// Credential for the transport; never used by the core itself
    pub bot_token: String,

    /// Whether fresh media messages trigger a payload download
    pub download_media: bool,

    /// Directory for the database and downloaded media
    pub data_dir: PathBuf,

    /// Directory for application logs
    pub logs_dir: PathBuf,
}

impl std::fmt::Debug for ArchiverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiverConfig")
            .field("bot_token", &"<REDACTED>")
            .field("download_media", &self.download_media)
            .field("data_dir", &self.data_dir)
            .field("logs_dir", &self.logs_dir)
            .finish()
    }
}

impl ArchiverConfig {
    pub fn new(bot_token: impl Into<String>, data_dir: &Path) -> Self {
        Self {
            bot_token: bot_token.into(),
            download_media: false,
            data_dir: data_dir.to_path_buf(),
            logs_dir: data_dir.join(LOGS_DIR_NAME),
        }
    }

    /// Loads the configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ArchiverError::Configuration(format!(
                    "Failed to read .env file: {e}"
                )));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `BOT_TOKEN` is required. `DOWNLOAD_MEDIA` accepts `true`, `1` or `yes` in any case.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("BOT_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ArchiverError::Configuration("BOT_TOKEN is required. Set it in .env file.".into())
            })?;

        let download_media = lookup("DOWNLOAD_MEDIA")
            .map(|raw| matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let data_dir = lookup("DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let logs_dir = lookup("LOGS_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(LOGS_DIR_NAME));

        Ok(Self {
            bot_token,
            download_media,
            data_dir,
            logs_dir,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join(MEDIA_DIR_NAME)
    }
}

/// Normalizes chat platform updates into the archive store.
pub struct Archiver {
    pub config: ArchiverConfig,
    store: Arc<dyn Store>,
    downloader: Option<Arc<dyn MediaDownloader>>,
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver")
            .field("config", &self.config)
            .field("store", &"<REDACTED>")
            .field("downloader", &self.downloader.is_some())
            .finish()
    }
}

impl Archiver {
    /// Sets up directories and logging, then opens the SQLite store at
    /// [`ArchiverConfig::db_path`].
    ///
    /// # Errors
    ///
    /// Fails if the data, logs or media directories cannot be created, or if the
    /// database cannot be opened or migrated. Both are fatal for the process.
    pub async fn initialize(config: ArchiverConfig) -> Result<Self> {
        let data_dir = &config.data_dir;
        let logs_dir = &config.logs_dir;

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))
            .map_err(ArchiverError::from)?;
        std::fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))
            .map_err(ArchiverError::from)?;
        if config.download_media {
            let media_dir = config.media_dir();
            std::fs::create_dir_all(&media_dir)
                .with_context(|| format!("Failed to create media directory: {:?}", media_dir))
                .map_err(ArchiverError::from)?;
        }

        init_tracing(logs_dir);

        let database = Database::new(config.db_path()).await?;
        tracing::info!(
            target: "chat_archiver::archiver::initialize",
            "Database initialized at {:?}",
            database.path
        );
        tracing::info!(
            target: "chat_archiver::archiver::initialize",
            "Download media: {}",
            config.download_media
        );

        Ok(Self::with_store(config, Arc::new(database)))
    }

    /// Builds an archiver over an already opened store.
    pub fn with_store(config: ArchiverConfig, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            store,
            downloader: None,
        }
    }

    /// Injects the collaborator that fetches media payloads when downloads are enabled.
    pub fn with_downloader(mut self, downloader: Arc<dyn MediaDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }
}

#[cfg(test)]
pub mod test_utils;
