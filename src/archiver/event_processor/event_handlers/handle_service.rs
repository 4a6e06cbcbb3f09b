use crate::archiver::{
    database::events::{
        EventKind, EventRecord, MemberPayload, MessagePinnedPayload, ServiceWrite,
        TitleChangedPayload,
    },
    error::Result,
    event_processor::classifier::ServiceMarker,
    Archiver,
};
use crate::types::{Chat, Message, User};

fn member_payload(member: &User) -> MemberPayload {
    MemberPayload {
        username: member.username.clone(),
        first_name: member.first_name.clone(),
    }
}

impl Archiver {
    /// Turns a service marker into event rows, one per joined member for joins.
    ///
    /// The chat, users and events of one update are written together or not at all.
    pub(crate) async fn handle_service(
        &self,
        message: &Message,
        marker: ServiceMarker<'_>,
    ) -> Result<Vec<i64>> {
        // A title change is applied to the chat row directly
        let chat = match marker {
            ServiceMarker::TitleChanged(title) => Chat {
                title: Some(title.to_string()),
                ..message.chat.clone()
            },
            _ => message.chat.clone(),
        };
        let actor = message.from.as_ref();
        let actor_id = actor.map(|user| user.id);

        let mut users: Vec<User> = actor.into_iter().cloned().collect();
        let mut events = Vec::new();
        let mut event_for = |user_id: Option<i64>, kind: EventKind| {
            events.push(EventRecord {
                chat_id: message.chat.id,
                user_id,
                kind,
                date: message.date,
            })
        };

        match marker {
            ServiceMarker::MembersJoined(members) => {
                for member in members {
                    event_for(
                        Some(member.id),
                        EventKind::MemberJoined(member_payload(member)),
                    );
                    users.push(member.clone());
                }
            }
            ServiceMarker::MemberLeft(member) => {
                event_for(Some(member.id), EventKind::MemberLeft(member_payload(member)));
                users.push(member.clone());
            }
            ServiceMarker::TitleChanged(title) => event_for(
                actor_id,
                EventKind::TitleChanged(TitleChangedPayload {
                    new_title: title.to_string(),
                }),
            ),
            ServiceMarker::MessagePinned(pinned_message_id) => event_for(
                actor_id,
                EventKind::MessagePinned(MessagePinnedPayload { pinned_message_id }),
            ),
        }

        let write = ServiceWrite {
            chat,
            users,
            events,
        };
        let event_ids = self.store.append_service(&write).await?;

        for record in &write.events {
            tracing::debug!(
                target: "chat_archiver::event_processor::handle_service",
                "Stored {} event in chat {} (user: {:?})",
                record.kind.event_type(),
                record.chat_id,
                record.user_id
            );
        }
        Ok(event_ids)
    }
}
