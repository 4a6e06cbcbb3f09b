use crate::types::ForwardOrigin;

/// Flattened provenance of a forwarded message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardInfo {
    pub origin_id: Option<i64>,
    pub origin_name: Option<String>,
}

impl ForwardInfo {
    /// Resolves an optional forward origin into (id, display name).
    ///
    /// A hidden user has a display name but no identifier. A message that was not
    /// forwarded resolves to both fields absent.
    pub fn resolve(origin: Option<&ForwardOrigin>) -> Self {
        let Some(origin) = origin else {
            return Self::default();
        };

        match origin {
            ForwardOrigin::User { sender_user } => Self {
                origin_id: Some(sender_user.id),
                origin_name: Some(sender_user.full_name()),
            },
            ForwardOrigin::HiddenUser { sender_user_name } => Self {
                origin_id: None,
                origin_name: Some(sender_user_name.clone()),
            },
            ForwardOrigin::Chat { sender_chat, .. } => Self {
                origin_id: Some(sender_chat.id),
                origin_name: sender_chat.title.clone(),
            },
            ForwardOrigin::Channel { chat, .. } => Self {
                origin_id: Some(chat.id),
                origin_name: chat.title.clone(),
            },
        }
    }
}
