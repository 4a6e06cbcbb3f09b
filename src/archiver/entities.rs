use crate::archiver::error::Result;
use crate::archiver::Archiver;
use crate::types::{Chat, User};

impl Archiver {
    /// Records the chat as last seen.
    pub(crate) async fn save_chat(&self, chat: &Chat) -> Result<()> {
        self.store.upsert_chat(chat).await?;
        Ok(())
    }

    /// Records the user as last seen and returns their id.
    ///
    /// An absent user is a no-op: no row, no placeholder, no error.
    pub(crate) async fn save_user(&self, user: Option<&User>) -> Result<Option<i64>> {
        let Some(user) = user else {
            return Ok(None);
        };
        self.store.upsert_user(user).await?;
        Ok(Some(user.id))
    }
}
