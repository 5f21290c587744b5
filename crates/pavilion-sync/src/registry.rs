//! Ordered conversation list with denormalized last-message summaries.
//!
//! The registry reconciles four independent sources: REST snapshots,
//! locally-originated sends, message deletions and pushed foreign
//! messages.  Baseline order is descending `last_message_at`; a
//! just-acted-on conversation is moved to the front regardless of
//! timestamps, so the user's own action is surfaced immediately.

use chrono::Utc;
use tracing::debug;

use pavilion_shared::events::ChatPushPayload;
use pavilion_shared::profile::provisional_name;
use pavilion_shared::types::{ConversationId, UserId};

use crate::models::{message_preview, ConversationSummary, MessageRecord};

/// Result of folding a pushed foreign message into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignPushOutcome {
    /// The conversation was updated and moved to the front.  `provisional`
    /// is true when the sender's display name is a placeholder that still
    /// needs resolving through the identity cache.
    Applied { provisional: bool },
    /// The conversation id is not in the registry; the push was dropped.
    /// A later full refresh picks the new conversation up.
    UnknownConversation,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationRegistry {
    entries: Vec<ConversationSummary>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replace from a REST snapshot.
    pub fn replace_all(&mut self, mut summaries: Vec<ConversationSummary>) {
        sort_by_recency(&mut summaries);
        self.entries = summaries;
    }

    /// Fold a just-sent local message into its conversation and move that
    /// conversation to the front, regardless of timestamps elsewhere.
    pub fn apply_local_send(
        &mut self,
        conversation_id: &ConversationId,
        message: &MessageRecord,
    ) -> bool {
        let Some(pos) = self.position(conversation_id) else {
            return false;
        };
        let mut entry = self.entries.remove(pos);
        entry.last_message_preview = message.preview();
        entry.last_message_at = Some(message.sent_at);
        entry.last_message_sender_id = Some(message.sender_id.clone());
        entry.last_message_sender_display_name = Some(message.sender_display_name.clone());

        // Only the remaining entries are re-validated against timestamp
        // order; the acted-on conversation stays pinned at the front.
        sort_by_recency(&mut self.entries);
        self.entries.insert(0, entry);
        true
    }

    /// Recompute a conversation's last-message summary after a deletion.
    ///
    /// `remaining_newest` is the newest message still in the timeline, or
    /// `None` when the deleted message was the last one.  Unlike a send,
    /// a deletion triggers a plain timestamp re-sort with no front-move.
    pub fn apply_deletion(
        &mut self,
        conversation_id: &ConversationId,
        remaining_newest: Option<&MessageRecord>,
    ) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| &e.id == conversation_id) else {
            return false;
        };
        match remaining_newest {
            Some(message) => {
                entry.last_message_preview = message.preview();
                entry.last_message_at = Some(message.sent_at);
                entry.last_message_sender_id = Some(message.sender_id.clone());
                entry.last_message_sender_display_name =
                    Some(message.sender_display_name.clone());
            }
            None => entry.clear_last_message(),
        }
        sort_by_recency(&mut self.entries);
        true
    }

    /// Fold a pushed foreign message into its conversation.
    ///
    /// `resolved_name` is the sender's display name when the identity cache
    /// already had it; otherwise the payload's own `sender_name` is used,
    /// and failing that a provisional `User(<id-prefix>)` placeholder that
    /// the caller patches later via [`update_sender_display_name`].
    ///
    /// A push for a conversation the registry does not hold is dropped:
    /// summaries are never synthesized from partial push payloads.
    ///
    /// [`update_sender_display_name`]: Self::update_sender_display_name
    pub fn apply_foreign_push(
        &mut self,
        payload: &ChatPushPayload,
        resolved_name: Option<&str>,
    ) -> ForeignPushOutcome {
        let Some(pos) = self.position(&payload.group_id) else {
            debug!(
                conversation = %payload.group_id,
                message = %payload.message_id,
                "Dropping push for unknown conversation"
            );
            return ForeignPushOutcome::UnknownConversation;
        };

        let provisional = resolved_name.is_none() && payload.sender_name.is_none();
        let display_name = resolved_name
            .map(str::to_string)
            .or_else(|| payload.sender_name.clone())
            .unwrap_or_else(|| provisional_name(&payload.sender_id));

        let mut entry = self.entries.remove(pos);
        entry.last_message_preview = payload.message_content_preview.clone().unwrap_or_else(|| {
            message_preview(
                payload.actual_message_content.as_deref(),
                payload.file_name.as_deref(),
            )
        });
        entry.last_message_at = Some(payload.sent_at.unwrap_or_else(Utc::now));
        entry.last_message_sender_id = Some(payload.sender_id.clone());
        entry.last_message_sender_display_name = Some(display_name);
        if let Some(ref name) = payload.group_name {
            if !name.is_empty() {
                entry.display_name = name.clone();
            }
        }

        sort_by_recency(&mut self.entries);
        self.entries.insert(0, entry);
        ForeignPushOutcome::Applied { provisional }
    }

    /// Patch a provisional sender name in place once the identity cache
    /// resolves.  Skipped when a newer message from someone else has since
    /// overwritten the summary.
    pub fn update_sender_display_name(
        &mut self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        display_name: &str,
    ) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| &e.id == conversation_id) else {
            return false;
        };
        if entry.last_message_sender_id.as_ref() != Some(sender_id) {
            return false;
        }
        entry.last_message_sender_display_name = Some(display_name.to_string());
        true
    }

    /// Unconditional removal (leave / kick / group deleted).
    pub fn remove_conversation(&mut self, conversation_id: &ConversationId) -> bool {
        match self.position(conversation_id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Option<&ConversationSummary> {
        self.entries.iter().find(|e| &e.id == conversation_id)
    }

    pub fn entries(&self) -> &[ConversationSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, conversation_id: &ConversationId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == conversation_id)
    }
}

/// Descending by `last_message_at`; conversations with no message sort
/// last (`None` orders below every `Some`).
fn sort_by_recency(entries: &mut [ConversationSummary]) {
    entries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pavilion_shared::constants::EMPTY_CONVERSATION_PREVIEW;
    use pavilion_shared::types::{MessageId, MessageKind};

    fn summary(id: &str, last_at: Option<chrono::DateTime<Utc>>) -> ConversationSummary {
        ConversationSummary {
            id: ConversationId::new(id),
            display_name: format!("conv {id}"),
            is_group: true,
            avatar_ref: None,
            last_message_preview: "hi".to_string(),
            last_message_at: last_at,
            last_message_sender_id: None,
            last_message_sender_display_name: None,
            participants: vec![],
        }
    }

    fn message(id: &str, conversation: &str, sent_at: chrono::DateTime<Utc>) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(id),
            conversation_id: ConversationId::new(conversation),
            sender_id: UserId::new("me"),
            sender_display_name: "Me".to_string(),
            content: Some(format!("msg {id}")),
            attachment_name: None,
            sent_at,
        }
    }

    fn chat_push(conversation: &str, sender: &str) -> ChatPushPayload {
        serde_json::from_value(serde_json::json!({
            "messageId": "m-push",
            "senderId": sender,
            "groupId": conversation,
            "messageType": "TEXT",
            "actualMessageContent": "pushed text",
            "sentAt": Utc::now().to_rfc3339(),
        }))
        .unwrap()
    }

    #[test]
    fn test_replace_all_sorts_descending_missing_last() {
        let t = Utc::now();
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![
            summary("empty", None),
            summary("old", Some(t - Duration::hours(2))),
            summary("new", Some(t)),
        ]);

        let ids: Vec<_> = registry.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "empty"]);
    }

    #[test]
    fn test_local_send_moves_conversation_to_front() {
        let t1 = Utc::now() - Duration::hours(1);
        let t2 = Utc::now();
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", Some(t1)), summary("b", Some(t2))]);
        assert_eq!(registry.entries()[0].id.as_str(), "b");

        // Send into the older conversation: front regardless of timestamps.
        let msg = message("m1", "a", t1);
        assert!(registry.apply_local_send(&ConversationId::new("a"), &msg));

        let ids: Vec<_> = registry.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(registry.entries()[0].last_message_preview, "msg m1");
        assert_eq!(
            registry.entries()[0].last_message_sender_display_name.as_deref(),
            Some("Me")
        );
    }

    #[test]
    fn test_local_send_unknown_conversation_is_noop() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", None)]);
        let msg = message("m1", "ghost", Utc::now());
        assert!(!registry.apply_local_send(&ConversationId::new("ghost"), &msg));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deletion_of_only_message_resets_summary() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", Some(Utc::now()))]);

        assert!(registry.apply_deletion(&ConversationId::new("a"), None));

        let entry = registry.get(&ConversationId::new("a")).unwrap();
        assert_eq!(entry.last_message_preview, EMPTY_CONVERSATION_PREVIEW);
        assert!(entry.last_message_at.is_none());
        assert!(entry.last_message_sender_id.is_none());
    }

    #[test]
    fn test_deletion_resorts_without_front_move() {
        let t = Utc::now();
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![
            summary("a", Some(t)),
            summary("b", Some(t - Duration::minutes(5))),
        ]);

        // Deleting a's newest leaves an older survivor; b is now newest.
        let survivor = message("m0", "a", t - Duration::hours(1));
        registry.apply_deletion(&ConversationId::new("a"), Some(&survivor));

        let ids: Vec<_> = registry.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_foreign_push_moves_to_front_with_provisional_name() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![
            summary("a", Some(Utc::now())),
            summary("b", Some(Utc::now() - Duration::minutes(1))),
        ]);

        let outcome = registry.apply_foreign_push(&chat_push("b", "stranger1"), None);
        assert_eq!(outcome, ForeignPushOutcome::Applied { provisional: true });

        let front = &registry.entries()[0];
        assert_eq!(front.id.as_str(), "b");
        assert_eq!(front.last_message_preview, "pushed text");
        assert_eq!(
            front.last_message_sender_display_name.as_deref(),
            Some("User(stranger)")
        );
    }

    #[test]
    fn test_foreign_push_uses_resolved_name_when_available() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", None)]);

        let outcome =
            registry.apply_foreign_push(&chat_push("a", "u-2"), Some("Nguyen Van A"));
        assert_eq!(outcome, ForeignPushOutcome::Applied { provisional: false });
        assert_eq!(
            registry.entries()[0].last_message_sender_display_name.as_deref(),
            Some("Nguyen Van A")
        );
    }

    #[test]
    fn test_foreign_push_for_unknown_conversation_is_dropped() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", None)]);

        let outcome = registry.apply_foreign_push(&chat_push("ghost", "u-2"), None);
        assert_eq!(outcome, ForeignPushOutcome::UnknownConversation);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&ConversationId::new("ghost")).is_none());
    }

    #[test]
    fn test_update_sender_display_name_patches_in_place() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", None)]);
        registry.apply_foreign_push(&chat_push("a", "u-2"), None);

        assert!(registry.update_sender_display_name(
            &ConversationId::new("a"),
            &UserId::new("u-2"),
            "Nguyen Van A",
        ));
        assert_eq!(
            registry.entries()[0].last_message_sender_display_name.as_deref(),
            Some("Nguyen Van A")
        );

        // Stale resolution for a different sender is skipped.
        assert!(!registry.update_sender_display_name(
            &ConversationId::new("a"),
            &UserId::new("someone-else"),
            "Stale Name",
        ));
    }

    #[test]
    fn test_remove_conversation() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", None), summary("b", None)]);

        assert!(registry.remove_conversation(&ConversationId::new("a")));
        assert!(!registry.remove_conversation(&ConversationId::new("a")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_attachment_preview_from_push() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary("a", None)]);

        let payload: ChatPushPayload = serde_json::from_value(serde_json::json!({
            "messageId": "m-file",
            "senderId": "u-2",
            "senderName": "Nguyen Van A",
            "groupId": "a",
            "messageType": "FILE",
            "fileName": "schedule.pdf",
        }))
        .unwrap();
        assert_eq!(payload.message_type, MessageKind::File);

        registry.apply_foreign_push(&payload, None);
        assert_eq!(
            registry.entries()[0].last_message_preview,
            "Sent: schedule.pdf"
        );
    }
}
