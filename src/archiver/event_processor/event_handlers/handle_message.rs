use crate::archiver::{
    database::messages::{MessageRecord, MessageType},
    error::Result,
    forward_origin::ForwardInfo,
    media::MediaExtract,
    Archiver,
};
use crate::types::Message;

/// Type-specific part of a message row.
struct MessageBody {
    message_type: MessageType,
    text: Option<String>,
    media: Option<MediaExtract>,
}

impl Archiver {
    pub(crate) async fn handle_text(
        &self,
        message: &Message,
        text: &str,
        is_edit: bool,
    ) -> Result<i64> {
        let body = MessageBody {
            message_type: MessageType::Text,
            text: Some(text.to_string()),
            media: None,
        };
        self.append_message(message, body, is_edit).await
    }

    /// Appends a media message. Fresh media is also downloaded when enabled; edits never are.
    pub(crate) async fn handle_media(
        &self,
        message: &Message,
        media: MediaExtract,
        is_edit: bool,
    ) -> Result<i64> {
        let file_id = media.file_id.clone();
        let body = MessageBody {
            message_type: media.message_type,
            text: message.caption.clone(),
            media: Some(media),
        };
        let id = self.append_message(message, body, is_edit).await?;

        if !is_edit {
            self.download_media(message.chat.id, message.message_id, &file_id)
                .await;
        }
        Ok(id)
    }

    pub(crate) async fn handle_other(
        &self,
        message: &Message,
        kind: &str,
        is_edit: bool,
    ) -> Result<i64> {
        let body = MessageBody {
            message_type: MessageType::Other,
            text: Some(kind.to_string()),
            media: None,
        };
        self.append_message(message, body, is_edit).await
    }

    /// Upserts the chat and sender, then appends the message row.
    async fn append_message(
        &self,
        message: &Message,
        body: MessageBody,
        is_edit: bool,
    ) -> Result<i64> {
        self.save_chat(&message.chat).await?;
        let user_id = self.save_user(message.from.as_ref()).await?;
        let forward = ForwardInfo::resolve(message.forward_origin.as_ref());
        let is_edit = is_edit && self.has_original(message).await?;

        let (media_file_id, media_meta) = match body.media {
            Some(media) => (Some(media.file_id), media.attributes),
            None => (None, None),
        };

        let record = MessageRecord {
            message_id: message.message_id,
            chat_id: message.chat.id,
            user_id,
            date: message.date,
            message_type: body.message_type,
            text: body.text,
            media_file_id,
            media_meta,
            reply_to: message.reply_to_message_id,
            fwd_from: forward.origin_id,
            fwd_name: forward.origin_name,
            is_edit,
        };

        let id = self.store.append_message(&record).await?;
        tracing::debug!(
            target: "chat_archiver::event_processor::handle_message",
            "Stored {} message {} in chat {} (edit: {})",
            record.message_type,
            record.message_id,
            record.chat_id,
            record.is_edit
        );
        Ok(id)
    }

    /// An edit row needs an original row for the same (chat, message number).
    async fn has_original(&self, message: &Message) -> Result<bool> {
        let found = self
            .store
            .has_original_message(message.chat.id, message.message_id)
            .await?;
        if !found {
            tracing::warn!(
                target: "chat_archiver::event_processor::handle_message",
                "Edit of message {} in chat {} has no original row, storing it as the original",
                message.message_id,
                message.chat.id
            );
        }
        Ok(found)
    }
}
