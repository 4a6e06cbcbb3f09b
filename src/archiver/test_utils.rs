use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::archiver::{
    database::{
        events::{EventRecord, ServiceWrite},
        messages::MessageRecord,
        Database, DatabaseError,
    },
    media::download::{MediaDownloader, RemoteFile},
    store::Store,
    Archiver, ArchiverConfig,
};
use crate::types::{Chat, ChatKind, Message, MessageContent, Update, UpdateKind, User};

pub(crate) fn test_chat(id: i64, title: Option<&str>) -> Chat {
    Chat {
        id,
        title: title.map(str::to_string),
        kind: ChatKind::Group,
    }
}

pub(crate) fn test_user(id: i64, username: Option<&str>, first_name: &str) -> User {
    User {
        id,
        username: username.map(str::to_string),
        first_name: first_name.to_string(),
        last_name: None,
    }
}

/// A message in a group chat sent by user 100.
pub(crate) fn test_message(chat_id: i64, message_id: i64, content: MessageContent) -> Message {
    Message {
        message_id,
        chat: test_chat(chat_id, Some("Test Chat")),
        from: Some(test_user(100, Some("alice"), "Alice")),
        date: Utc.with_ymd_and_hms(2026, 2, 22, 12, 0, 0).unwrap(),
        reply_to_message_id: None,
        forward_origin: None,
        caption: None,
        content,
    }
}

pub(crate) fn message_update(update_id: i64, message: Message) -> Update {
    Update {
        update_id,
        kind: UpdateKind::Message(message),
    }
}

fn test_config(data_dir: &Path) -> ArchiverConfig {
    ArchiverConfig::new("test_token", data_dir)
}

/// Archiver over a fresh SQLite file, plus a handle for reading rows back.
pub(crate) async fn create_test_archiver() -> (Archiver, Arc<Database>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(temp_dir.path());
    let database = Arc::new(
        Database::new(config.db_path())
            .await
            .expect("Failed to create test database"),
    );
    let archiver = Archiver::with_store(config, database.clone());
    (archiver, database, temp_dir)
}

pub(crate) fn create_memory_archiver(store: Arc<MemoryStore>) -> Archiver {
    Archiver::with_store(test_config(Path::new("/nonexistent")), store)
}

#[derive(Default)]
struct MemoryState {
    chats: HashMap<i64, Chat>,
    users: HashMap<i64, User>,
    messages: Vec<MessageRecord>,
    events: Vec<EventRecord>,
    failing_chats: HashSet<i64>,
    failing_users: HashSet<i64>,
    panicking_chats: HashSet<i64>,
}

/// In-memory [`Store`] with per-chat and per-user failure injection.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every write touching this chat fails with a store error.
    pub(crate) fn fail_for_chat(&self, chat_id: i64) {
        self.state().failing_chats.insert(chat_id);
    }

    /// Every write of this user fails with a store error.
    pub(crate) fn fail_for_user(&self, user_id: i64) {
        self.state().failing_users.insert(user_id);
    }

    /// Every write touching this chat panics.
    pub(crate) fn panic_for_chat(&self, chat_id: i64) {
        self.state().panicking_chats.insert(chat_id);
    }

    pub(crate) fn messages(&self) -> Vec<MessageRecord> {
        self.state().messages.clone()
    }

    pub(crate) fn events(&self) -> Vec<EventRecord> {
        self.state().events.clone()
    }

    pub(crate) fn users(&self) -> Vec<User> {
        self.state().users.values().cloned().collect()
    }

    fn check_chat(&self, chat_id: i64) -> Result<(), DatabaseError> {
        let (fails, panics) = {
            let state = self.state();
            (
                state.failing_chats.contains(&chat_id),
                state.panicking_chats.contains(&chat_id),
            )
        };
        if panics {
            panic!("injected panic for chat {chat_id}");
        }
        if fails {
            return Err(DatabaseError::Sqlx(sqlx::Error::Protocol(format!(
                "injected failure for chat {chat_id}"
            ))));
        }
        Ok(())
    }

    fn check_user(&self, user_id: i64) -> Result<(), DatabaseError> {
        if self.state().failing_users.contains(&user_id) {
            return Err(DatabaseError::Sqlx(sqlx::Error::Protocol(format!(
                "injected failure for user {user_id}"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_chat(&self, chat: &Chat) -> Result<(), DatabaseError> {
        self.check_chat(chat.id)?;
        self.state().chats.insert(chat.id, chat.clone());
        Ok(())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.check_user(user.id)?;
        self.state().users.insert(user.id, user.clone());
        Ok(())
    }

    async fn append_message(&self, record: &MessageRecord) -> Result<i64, DatabaseError> {
        self.check_chat(record.chat_id)?;
        let mut state = self.state();
        state.messages.push(record.clone());
        Ok(state.messages.len() as i64)
    }

    async fn append_event(&self, record: &EventRecord) -> Result<i64, DatabaseError> {
        self.check_chat(record.chat_id)?;
        let mut state = self.state();
        state.events.push(record.clone());
        Ok(state.events.len() as i64)
    }

    async fn append_service(&self, write: &ServiceWrite) -> Result<Vec<i64>, DatabaseError> {
        // Every injected failure is raised before anything is applied
        self.check_chat(write.chat.id)?;
        for user in &write.users {
            self.check_user(user.id)?;
        }
        for record in &write.events {
            self.check_chat(record.chat_id)?;
        }

        let mut state = self.state();
        state.chats.insert(write.chat.id, write.chat.clone());
        for user in &write.users {
            state.users.insert(user.id, user.clone());
        }
        let mut ids = Vec::with_capacity(write.events.len());
        for record in &write.events {
            state.events.push(record.clone());
            ids.push(state.events.len() as i64);
        }
        Ok(ids)
    }

    async fn has_original_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .state()
            .messages
            .iter()
            .any(|m| m.chat_id == chat_id && m.message_id == message_id && !m.is_edit))
    }
}

/// Downloader that serves one canned file, or always fails.
pub(crate) struct FakeDownloader {
    file: Option<RemoteFile>,
    requested: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub(crate) fn serving(file_path: &str, bytes: &[u8]) -> Self {
        Self {
            file: Some(RemoteFile {
                file_path: file_path.to_string(),
                bytes: bytes.to_vec(),
            }),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            file: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaDownloader for FakeDownloader {
    async fn fetch(
        &self,
        file_id: &str,
    ) -> std::result::Result<RemoteFile, Box<dyn std::error::Error + Send + Sync>> {
        self.requested.lock().unwrap().push(file_id.to_string());
        self.file
            .clone()
            .ok_or_else(|| "file server unavailable".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForwardOrigin;

    #[tokio::test]
    async fn test_memory_store_null_user_and_forward() {
        let store = Arc::new(MemoryStore::default());
        let archiver = create_memory_archiver(store.clone());

        let mut message = test_message(
            -1001,
            1,
            MessageContent::Text {
                text: "forwarded".to_string(),
            },
        );
        message.from = None;
        message.forward_origin = Some(ForwardOrigin::HiddenUser {
            sender_user_name: "Hidden".to_string(),
        });

        assert!(archiver
            .process_update(message_update(1, message))
            .await
            .is_stored());

        assert!(store.users().is_empty());
        let messages = store.messages();
        assert_eq!(messages[0].user_id, None);
        assert_eq!(messages[0].fwd_from, None);
        assert_eq!(messages[0].fwd_name.as_deref(), Some("Hidden"));
    }

    #[tokio::test]
    async fn test_memory_store_joined_members() {
        let store = Arc::new(MemoryStore::default());
        let archiver = create_memory_archiver(store.clone());

        let members = (1..=3)
            .map(|i| test_user(300 + i, None, &format!("Member {i}")))
            .collect();
        let outcome = archiver
            .process_update(message_update(
                1,
                test_message(-1001, 2, MessageContent::NewChatMembers { members }),
            ))
            .await;
        assert!(outcome.is_stored());
        assert_eq!(store.events().len(), 3);
        // Three members plus the sender
        assert_eq!(store.users().len(), 4);
    }
}
