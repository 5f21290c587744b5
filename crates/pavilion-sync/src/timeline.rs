//! Message timeline for the currently-open conversation.
//!
//! The timeline is rebuilt from a fresh fetch every time a conversation is
//! opened and discarded on navigate-away; nothing here persists.  Messages
//! are kept ascending by `sent_at` so arrival-order races between local
//! sends and pushed foreign messages resolve at render time.

use pavilion_shared::types::{ConversationId, MessageId, UserId};

use crate::models::MessageRecord;

#[derive(Debug, Clone)]
pub struct MessageTimeline {
    conversation_id: ConversationId,
    messages: Vec<MessageRecord>,
}

impl MessageTimeline {
    /// Build a timeline from a fetched batch, sorted ascending by send time.
    pub fn new(conversation_id: ConversationId, mut messages: Vec<MessageRecord>) -> Self {
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        Self {
            conversation_id,
            messages,
        }
    }

    /// Append one message, keeping ascending order.  A message whose id is
    /// already present replaces the existing record (backend confirmation
    /// of an optimistic send).
    pub fn append(&mut self, message: MessageRecord) {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
        } else {
            self.messages.push(message);
        }
        self.messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
    }

    /// Remove a message by id, returning the removed record.
    pub fn remove(&mut self, message_id: &MessageId) -> Option<MessageRecord> {
        let pos = self.messages.iter().position(|m| &m.id == message_id)?;
        Some(self.messages.remove(pos))
    }

    /// The newest surviving message, used to recompute the conversation
    /// summary after a deletion.
    pub fn newest(&self) -> Option<&MessageRecord> {
        self.messages.last()
    }

    /// Patch the display name on every message from `sender_id`, once the
    /// identity cache resolves a name that was provisional on arrival.
    pub fn update_sender_display_name(&mut self, sender_id: &UserId, display_name: &str) -> usize {
        let mut patched = 0;
        for message in self.messages.iter_mut().filter(|m| &m.sender_id == sender_id) {
            message.sender_display_name = display_name.to_string();
            patched += 1;
        }
        patched
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pavilion_shared::types::UserId;

    fn message(id: &str, sent_at: chrono::DateTime<Utc>) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(id),
            conversation_id: ConversationId::new("c-1"),
            sender_id: UserId::new("u-1"),
            sender_display_name: "Someone".to_string(),
            content: Some(format!("msg {id}")),
            attachment_name: None,
            sent_at,
        }
    }

    #[test]
    fn test_new_sorts_ascending() {
        let t = Utc::now();
        let timeline = MessageTimeline::new(
            ConversationId::new("c-1"),
            vec![
                message("b", t),
                message("a", t - Duration::minutes(5)),
                message("c", t + Duration::minutes(5)),
            ],
        );
        let ids: Vec<_> = timeline.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(timeline.newest().unwrap().id.as_str(), "c");
    }

    #[test]
    fn test_append_out_of_order_resorts() {
        let t = Utc::now();
        let mut timeline =
            MessageTimeline::new(ConversationId::new("c-1"), vec![message("b", t)]);
        timeline.append(message("a", t - Duration::minutes(1)));

        let ids: Vec<_> = timeline.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_append_duplicate_id_replaces() {
        let t = Utc::now();
        let mut timeline =
            MessageTimeline::new(ConversationId::new("c-1"), vec![message("a", t)]);

        let mut confirmed = message("a", t);
        confirmed.content = Some("confirmed".to_string());
        timeline.append(confirmed);

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.messages()[0].content.as_deref(), Some("confirmed"));
    }

    #[test]
    fn test_remove_returns_record_and_updates_newest() {
        let t = Utc::now();
        let mut timeline = MessageTimeline::new(
            ConversationId::new("c-1"),
            vec![message("a", t - Duration::minutes(1)), message("b", t)],
        );

        let removed = timeline.remove(&MessageId::new("b")).unwrap();
        assert_eq!(removed.id.as_str(), "b");
        assert_eq!(timeline.newest().unwrap().id.as_str(), "a");

        timeline.remove(&MessageId::new("a"));
        assert!(timeline.newest().is_none());
        assert!(timeline.is_empty());

        assert!(timeline.remove(&MessageId::new("ghost")).is_none());
    }

    #[test]
    fn test_update_sender_display_name_patches_all_their_messages() {
        let t = Utc::now();
        let mut other = message("x", t + Duration::minutes(1));
        other.sender_id = UserId::new("u-2");
        other.sender_display_name = "User(u-2)".to_string();

        let mut timeline = MessageTimeline::new(
            ConversationId::new("c-1"),
            vec![message("a", t), other],
        );

        let patched = timeline.update_sender_display_name(&UserId::new("u-2"), "Nguyen Van A");
        assert_eq!(patched, 1);
        assert_eq!(
            timeline.messages()[1].sender_display_name,
            "Nguyen Van A"
        );
        // Messages from other senders are untouched.
        assert_eq!(timeline.messages()[0].sender_display_name, "Someone");
    }
}
