//! Inbound update model handed over by the transport.
//!
//! Every polymorphic axis of an update (its category, the content it carries and the
//! provenance of a forwarded message) is a closed enum, so extraction code has to match
//! exhaustively.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound notification from the chat platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub kind: UpdateKind,
}

/// The category an update is delivered under.
///
/// Edits arrive as their own categories rather than as a flag on the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Message(Message),
    EditedMessage(Message),
    ChannelPost(Message),
    EditedChannelPost(Message),
    /// Categories that carry no chat message (inline queries, polls, ...).
    Unsupported { category: String },
}

impl UpdateKind {
    pub fn category(&self) -> &str {
        match self {
            UpdateKind::Message(_) => "message",
            UpdateKind::EditedMessage(_) => "edited_message",
            UpdateKind::ChannelPost(_) => "channel_post",
            UpdateKind::EditedChannelPost(_) => "edited_channel_post",
            UpdateKind::Unsupported { category } => category,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            UpdateKind::Message(message)
            | UpdateKind::EditedMessage(message)
            | UpdateKind::ChannelPost(message)
            | UpdateKind::EditedChannelPost(message) => Some(message),
            UpdateKind::Unsupported { .. } => None,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            UpdateKind::EditedMessage(_) | UpdateKind::EditedChannelPost(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    /// Absent for channel posts and some service messages.
    #[serde(default)]
    pub from: Option<User>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub forward_origin: Option<ForwardOrigin>,
    #[serde(default)]
    pub caption: Option<String>,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub kind: ChatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        }
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(ChatKind::Private),
            "group" => Ok(ChatKind::Group),
            "supergroup" => Ok(ChatKind::Supergroup),
            "channel" => Ok(ChatKind::Channel),
            other => Err(format!("unknown chat kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last_name) if !last_name.is_empty() => {
                format!("{} {}", self.first_name, last_name)
            }
            _ => self.first_name.clone(),
        }
    }
}

/// Provenance of a forwarded message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForwardOrigin {
    User {
        sender_user: User,
    },
    /// The original sender hides their account; only a display name is known.
    HiddenUser {
        sender_user_name: String,
    },
    Chat {
        sender_chat: Chat,
        #[serde(default)]
        author_signature: Option<String>,
    },
    Channel {
        chat: Chat,
        message_id: i64,
        #[serde(default)]
        author_signature: Option<String>,
    },
}

/// What a message carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    /// Every resolution the platform generated, smallest first.
    Photo {
        sizes: Vec<PhotoSize>,
    },
    Video(Video),
    Document(Document),
    Audio(Audio),
    Voice(Voice),
    VideoNote(VideoNote),
    Sticker(Sticker),
    Animation(Animation),
    NewChatMembers {
        members: Vec<User>,
    },
    LeftChatMember {
        member: User,
    },
    NewChatTitle {
        title: String,
    },
    PinnedMessage {
        message_id: i64,
    },
    /// A content kind this crate does not model (location, poll, contact, ...).
    Unsupported {
        kind: String,
    },
}

impl MessageContent {
    /// Literal name of the content kind.
    pub fn kind_name(&self) -> &str {
        match self {
            MessageContent::Text { .. } => "text",
            MessageContent::Photo { .. } => "photo",
            MessageContent::Video(_) => "video",
            MessageContent::Document(_) => "document",
            MessageContent::Audio(_) => "audio",
            MessageContent::Voice(_) => "voice",
            MessageContent::VideoNote(_) => "video_note",
            MessageContent::Sticker(_) => "sticker",
            MessageContent::Animation(_) => "animation",
            MessageContent::NewChatMembers { .. } => "new_chat_members",
            MessageContent::LeftChatMember { .. } => "left_chat_member",
            MessageContent::NewChatTitle { .. } => "new_chat_title",
            MessageContent::PinnedMessage { .. } => "pinned_message",
            MessageContent::Unsupported { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audio {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoNote {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub duration: u32,
    /// Diameter of the round video.
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub set_name: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
}
