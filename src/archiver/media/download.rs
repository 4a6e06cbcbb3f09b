use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::archiver::{
    error::{ArchiverError, Result},
    Archiver,
};

/// A media payload fetched by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Path of the file on the platform's file server.
    pub file_path: String,
    pub bytes: Vec<u8>,
}

/// Fetches media payloads by their opaque platform reference.
///
/// Implemented by the transport; the archiver only decides when to fetch and where
/// the payload lands on disk.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn fetch(
        &self,
        file_id: &str,
    ) -> std::result::Result<RemoteFile, Box<dyn std::error::Error + Send + Sync>>;
}

/// Reduces a remote path to a filesystem-safe basename.
///
/// Everything outside alphanumerics, `_`, `-` and `.` becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let sanitized: String = basename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Never resolve to the directory itself or its parent
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        sanitized
    }
}

/// `<media_dir>/<chat_id>_<message_id>_<sanitized basename>`
pub fn destination_path(
    media_dir: &Path,
    chat_id: i64,
    message_id: i64,
    remote_path: &str,
) -> PathBuf {
    media_dir.join(format!(
        "{}_{}_{}",
        chat_id,
        message_id,
        sanitize_filename(remote_path)
    ))
}

impl Archiver {
    /// Fetches a fresh media payload into the media directory when downloads are enabled.
    ///
    /// Failures are logged and swallowed; the message row is already written.
    pub(crate) async fn download_media(&self, chat_id: i64, message_id: i64, file_id: &str) {
        if !self.config.download_media {
            return;
        }
        let Some(downloader) = self.downloader.as_deref() else {
            tracing::debug!(
                target: "chat_archiver::media::download_media",
                "Media download enabled but no downloader configured, skipping {}",
                file_id
            );
            return;
        };

        match self
            .fetch_to_disk(downloader, chat_id, message_id, file_id)
            .await
        {
            Ok(path) => tracing::info!(
                target: "chat_archiver::media::download_media",
                "Downloaded media to {:?}",
                path
            ),
            Err(e) => tracing::warn!(
                target: "chat_archiver::media::download_media",
                "Failed to download media {} for message {} in chat {}: {}",
                file_id,
                message_id,
                chat_id,
                e
            ),
        }
    }

    async fn fetch_to_disk(
        &self,
        downloader: &dyn MediaDownloader,
        chat_id: i64,
        message_id: i64,
        file_id: &str,
    ) -> Result<PathBuf> {
        let remote = downloader
            .fetch(file_id)
            .await
            .map_err(|e| ArchiverError::MediaDownload(e.to_string()))?;

        let media_dir = self.config.media_dir();
        tokio::fs::create_dir_all(&media_dir).await?;
        let path = destination_path(&media_dir, chat_id, message_id, &remote.file_path);
        tokio::fs::write(&path, &remote.bytes).await?;
        Ok(path)
    }
}
