use crate::archiver::media::MediaExtract;
use crate::types::{Message, MessageContent, Update, User};

/// Recognized service markers, each mapped to one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceMarker<'a> {
    MembersJoined(&'a [User]),
    MemberLeft(&'a User),
    TitleChanged(&'a str),
    MessagePinned(i64),
}

/// Result of the single classification pass over an update.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Classification<'a> {
    Text {
        message: &'a Message,
        text: &'a str,
        is_edit: bool,
    },
    Media {
        message: &'a Message,
        media: MediaExtract,
        is_edit: bool,
    },
    Service {
        message: &'a Message,
        marker: ServiceMarker<'a>,
    },
    /// Catch-all message: the body is the literal content-kind name.
    Other {
        message: &'a Message,
        kind: &'a str,
        is_edit: bool,
    },
    /// Categories that carry no chat message.
    Ignored {
        category: &'a str,
    },
}

impl Classification<'_> {
    /// Short label used in reports and diagnostics.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Classification::Text { is_edit: false, .. } => "text",
            Classification::Text { is_edit: true, .. } => "edited_text",
            Classification::Media { is_edit: false, .. } => "media",
            Classification::Media { is_edit: true, .. } => "edited_media",
            Classification::Service { .. } => "service",
            Classification::Other { is_edit: false, .. } => "other",
            Classification::Other { is_edit: true, .. } => "edited_other",
            Classification::Ignored { .. } => "ignored",
        }
    }

    pub(crate) fn message(&self) -> Option<&Message> {
        match self {
            Classification::Text { message, .. }
            | Classification::Media { message, .. }
            | Classification::Service { message, .. }
            | Classification::Other { message, .. } => Some(message),
            Classification::Ignored { .. } => None,
        }
    }
}

/// Assigns an update to exactly one branch.
///
/// Edits go through the same field extraction as fresh messages. Service markers
/// inside an edit are not events, so they land in the catch-all.
pub(crate) fn classify(update: &Update) -> Classification<'_> {
    let Some(message) = update.kind.message() else {
        let category = update.kind.category();
        tracing::debug!(
            target: "chat_archiver::event_processor::classify",
            "Ignoring update {} of unsupported category {}",
            update.update_id,
            category
        );
        return Classification::Ignored { category };
    };
    let is_edit = update.kind.is_edit();

    match &message.content {
        MessageContent::Text { text } => Classification::Text {
            message,
            text,
            is_edit,
        },
        MessageContent::Photo { .. }
        | MessageContent::Video(_)
        | MessageContent::Document(_)
        | MessageContent::Audio(_)
        | MessageContent::Voice(_)
        | MessageContent::VideoNote(_)
        | MessageContent::Sticker(_)
        | MessageContent::Animation(_) => match MediaExtract::from_content(&message.content) {
            Some(media) => Classification::Media {
                message,
                media,
                is_edit,
            },
            None => {
                tracing::warn!(
                    target: "chat_archiver::event_processor::classify",
                    "Malformed {} payload in update {} (chat {}, message {}), archiving as other",
                    message.content.kind_name(),
                    update.update_id,
                    message.chat.id,
                    message.message_id
                );
                Classification::Other {
                    message,
                    kind: message.content.kind_name(),
                    is_edit,
                }
            }
        },
        MessageContent::NewChatMembers { .. }
        | MessageContent::LeftChatMember { .. }
        | MessageContent::NewChatTitle { .. }
        | MessageContent::PinnedMessage { .. }
            if is_edit =>
        {
            Classification::Other {
                message,
                kind: message.content.kind_name(),
                is_edit,
            }
        }
        MessageContent::NewChatMembers { members } => Classification::Service {
            message,
            marker: ServiceMarker::MembersJoined(members),
        },
        MessageContent::LeftChatMember { member } => Classification::Service {
            message,
            marker: ServiceMarker::MemberLeft(member),
        },
        MessageContent::NewChatTitle { title } => Classification::Service {
            message,
            marker: ServiceMarker::TitleChanged(title),
        },
        MessageContent::PinnedMessage { message_id } => Classification::Service {
            message,
            marker: ServiceMarker::MessagePinned(*message_id),
        },
        MessageContent::Unsupported { kind } => {
            tracing::debug!(
                target: "chat_archiver::event_processor::classify",
                "Unmodeled content kind {} in update {} ({})",
                kind,
                update.update_id,
                update.kind.category()
            );
            Classification::Other {
                message,
                kind,
                is_edit,
            }
        }
    }
}
