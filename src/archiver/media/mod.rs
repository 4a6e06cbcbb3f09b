use crate::archiver::database::messages::{MediaAttributes, MessageType};
use crate::types::MessageContent;

pub mod download;

/// Normalized fields of one media-bearing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaExtract {
    pub message_type: MessageType,
    /// Opaque platform reference to the media payload.
    pub file_id: String,
    pub attributes: Option<MediaAttributes>,
}

impl MediaExtract {
    /// Extracts the media fields of one of the eight media shapes.
    ///
    /// Returns `None` for non-media content and for malformed media (a photo without
    /// sizes, an empty file reference); callers fall back to the catch-all path.
    pub fn from_content(content: &MessageContent) -> Option<Self> {
        let (message_type, file_id, attributes) = match content {
            MessageContent::Photo { sizes } => {
                // Sizes are ordered smallest first
                let photo = sizes.last()?;
                (
                    MessageType::Photo,
                    &photo.file_id,
                    MediaAttributes::new()
                        .with_size(photo.file_size)
                        .with_width(photo.width)
                        .with_height(photo.height),
                )
            }
            MessageContent::Video(video) => (
                MessageType::Video,
                &video.file_id,
                MediaAttributes::new()
                    .with_size(video.file_size)
                    .with_mime(video.mime_type.as_deref())
                    .with_name(video.file_name.as_deref())
                    .with_duration(video.duration)
                    .with_width(video.width)
                    .with_height(video.height),
            ),
            MessageContent::Document(document) => (
                MessageType::Document,
                &document.file_id,
                MediaAttributes::new()
                    .with_size(document.file_size)
                    .with_mime(document.mime_type.as_deref())
                    .with_name(document.file_name.as_deref()),
            ),
            MessageContent::Audio(audio) => (
                MessageType::Audio,
                &audio.file_id,
                MediaAttributes::new()
                    .with_size(audio.file_size)
                    .with_mime(audio.mime_type.as_deref())
                    .with_name(audio.file_name.as_deref())
                    .with_duration(audio.duration),
            ),
            MessageContent::Voice(voice) => (
                MessageType::Voice,
                &voice.file_id,
                MediaAttributes::new()
                    .with_size(voice.file_size)
                    .with_mime(voice.mime_type.as_deref())
                    .with_duration(voice.duration),
            ),
            MessageContent::VideoNote(video_note) => (
                MessageType::VideoNote,
                &video_note.file_id,
                MediaAttributes::new()
                    .with_size(video_note.file_size)
                    .with_duration(video_note.duration)
                    .with_length(video_note.length),
            ),
            MessageContent::Sticker(sticker) => (
                MessageType::Sticker,
                &sticker.file_id,
                MediaAttributes::new()
                    .with_emoji(sticker.emoji.as_deref())
                    .with_set_name(sticker.set_name.as_deref())
                    .with_width(sticker.width)
                    .with_height(sticker.height),
            ),
            MessageContent::Animation(animation) => (
                MessageType::Animation,
                &animation.file_id,
                MediaAttributes::new()
                    .with_size(animation.file_size)
                    .with_mime(animation.mime_type.as_deref())
                    .with_name(animation.file_name.as_deref())
                    .with_duration(animation.duration)
                    .with_width(animation.width)
                    .with_height(animation.height),
            ),
            MessageContent::Text { .. }
            | MessageContent::NewChatMembers { .. }
            | MessageContent::LeftChatMember { .. }
            | MessageContent::NewChatTitle { .. }
            | MessageContent::PinnedMessage { .. }
            | MessageContent::Unsupported { .. } => return None,
        };

        if file_id.is_empty() {
            return None;
        }

        Some(Self {
            message_type,
            file_id: file_id.clone(),
            attributes: attributes.into_non_empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Animation, Audio, Document, PhotoSize, Sticker, Video, VideoNote, Voice,
    };
    use serde_json::json;

    fn attributes_json(extract: &MediaExtract) -> serde_json::Value {
        serde_json::to_value(extract.attributes.clone().unwrap_or_default()).unwrap()
    }

    #[test]
    fn test_photo_uses_largest_size() {
        let content = MessageContent::Photo {
            sizes: vec![
                PhotoSize {
                    file_id: "photo_small".to_string(),
                    file_size: Some(1000),
                    width: 90,
                    height: 60,
                },
                PhotoSize {
                    file_id: "photo_123".to_string(),
                    file_size: Some(50000),
                    width: 1920,
                    height: 1080,
                },
            ],
        };

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::Photo);
        assert_eq!(extract.file_id, "photo_123");
        assert_eq!(
            attributes_json(&extract),
            json!({ "size": 50000, "width": 1920, "height": 1080 })
        );
    }

    #[test]
    fn test_photo_without_sizes_is_not_media() {
        let content = MessageContent::Photo { sizes: vec![] };
        assert!(MediaExtract::from_content(&content).is_none());
    }

    #[test]
    fn test_video_attributes() {
        let content = MessageContent::Video(Video {
            file_id: "video_1".to_string(),
            file_size: Some(2048),
            mime_type: Some("video/mp4".to_string()),
            file_name: None,
            duration: 12,
            width: 640,
            height: 0,
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::Video);
        assert_eq!(
            attributes_json(&extract),
            json!({ "size": 2048, "mime": "video/mp4", "duration": 12, "width": 640 })
        );
    }

    #[test]
    fn test_document_attributes() {
        let content = MessageContent::Document(Document {
            file_id: "doc_456".to_string(),
            file_size: Some(1024),
            mime_type: Some("application/pdf".to_string()),
            file_name: Some("report.pdf".to_string()),
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::Document);
        assert_eq!(extract.file_id, "doc_456");
        assert_eq!(
            attributes_json(&extract),
            json!({ "size": 1024, "mime": "application/pdf", "name": "report.pdf" })
        );
    }

    #[test]
    fn test_audio_attributes() {
        let content = MessageContent::Audio(Audio {
            file_id: "audio_1".to_string(),
            file_size: None,
            mime_type: Some("audio/mpeg".to_string()),
            file_name: Some("song.mp3".to_string()),
            duration: 180,
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::Audio);
        assert_eq!(
            attributes_json(&extract),
            json!({ "mime": "audio/mpeg", "name": "song.mp3", "duration": 180 })
        );
    }

    #[test]
    fn test_voice_attributes() {
        let content = MessageContent::Voice(Voice {
            file_id: "voice_1".to_string(),
            file_size: Some(300),
            mime_type: Some("audio/ogg".to_string()),
            duration: 5,
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::Voice);
        assert_eq!(
            attributes_json(&extract),
            json!({ "size": 300, "mime": "audio/ogg", "duration": 5 })
        );
    }

    #[test]
    fn test_video_note_attributes() {
        let content = MessageContent::VideoNote(VideoNote {
            file_id: "note_1".to_string(),
            file_size: Some(900),
            duration: 7,
            length: 240,
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::VideoNote);
        assert_eq!(
            attributes_json(&extract),
            json!({ "size": 900, "duration": 7, "length": 240 })
        );
    }

    #[test]
    fn test_sticker_attributes() {
        let content = MessageContent::Sticker(Sticker {
            file_id: "sticker_1".to_string(),
            emoji: Some("🐱".to_string()),
            set_name: None,
            width: 512,
            height: 512,
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::Sticker);
        assert_eq!(
            attributes_json(&extract),
            json!({ "emoji": "🐱", "width": 512, "height": 512 })
        );
    }

    #[test]
    fn test_animation_attributes() {
        let content = MessageContent::Animation(Animation {
            file_id: "gif_1".to_string(),
            file_size: Some(4096),
            mime_type: Some("video/mp4".to_string()),
            file_name: Some("cat.gif.mp4".to_string()),
            duration: 3,
            width: 320,
            height: 240,
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.message_type, MessageType::Animation);
        assert_eq!(
            attributes_json(&extract),
            json!({
                "size": 4096,
                "mime": "video/mp4",
                "name": "cat.gif.mp4",
                "duration": 3,
                "width": 320,
                "height": 240
            })
        );
    }

    #[test]
    fn test_media_with_only_default_fields_has_no_attributes() {
        let content = MessageContent::Document(Document {
            file_id: "doc_empty".to_string(),
            file_size: Some(0),
            mime_type: Some(String::new()),
            file_name: None,
        });

        let extract = MediaExtract::from_content(&content).unwrap();
        assert_eq!(extract.file_id, "doc_empty");
        assert!(extract.attributes.is_none());
    }

    #[test]
    fn test_empty_file_reference_is_not_media() {
        let content = MessageContent::Voice(Voice {
            file_id: String::new(),
            file_size: Some(300),
            mime_type: None,
            duration: 5,
        });
        assert!(MediaExtract::from_content(&content).is_none());
    }

    #[test]
    fn test_non_media_content() {
        let content = MessageContent::Text {
            text: "hello".to_string(),
        };
        assert!(MediaExtract::from_content(&content).is_none());

        let content = MessageContent::Unsupported {
            kind: "location".to_string(),
        };
        assert!(MediaExtract::from_content(&content).is_none());
    }
}
