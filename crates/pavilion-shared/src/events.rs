//! Inbound push-channel wire shapes.
//!
//! Every field the server might omit is optional here; defaulting happens
//! when a payload is folded into local state (missing notification ids are
//! synthesized, missing timestamps default to the arrival time).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{ConversationId, MessageId, MessageKind, UserId};

/// One frame received on the push channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushFrame {
    Notification(NotificationPayload),
    GlobalChatNotification(ChatPushPayload),
}

/// A server-originated notification. All fields optional on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub related_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A chat message authored by another user, pushed out of band.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPushPayload {
    pub message_id: MessageId,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub group_id: ConversationId,
    #[serde(default)]
    pub group_name: Option<String>,
    pub message_type: MessageKind,
    #[serde(default)]
    pub actual_message_content: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub message_content_preview: Option<String>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification_frame_with_sparse_fields() {
        let raw = r#"{"event":"notification","data":{"title":"Event updated"}}"#;
        let frame: PushFrame = serde_json::from_str(raw).unwrap();
        match frame {
            PushFrame::Notification(n) => {
                assert_eq!(n.title.as_deref(), Some("Event updated"));
                assert!(n.id.is_none());
                assert!(n.read.is_none());
                assert!(n.created_at.is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_chat_frame() {
        let raw = r#"{
            "event": "global_chat_notification",
            "data": {
                "messageId": "m-9",
                "senderId": "u-2",
                "senderName": "Nguyen Van A",
                "groupId": "c-1",
                "groupName": "Chess club",
                "messageType": "FILE",
                "fileName": "schedule.pdf",
                "sentAt": "2025-03-01T10:00:00Z"
            }
        }"#;
        let frame: PushFrame = serde_json::from_str(raw).unwrap();
        match frame {
            PushFrame::GlobalChatNotification(m) => {
                assert_eq!(m.message_id.as_str(), "m-9");
                assert_eq!(m.message_type, MessageKind::File);
                assert_eq!(m.file_name.as_deref(), Some("schedule.pdf"));
                assert!(m.actual_message_content.is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_kind_is_an_error() {
        let raw = r#"{"event":"presence","data":{}}"#;
        assert!(serde_json::from_str::<PushFrame>(raw).is_err());
    }
}
