//! Domain model structs held in the client's reconciliation state.
//!
//! Every struct derives `Serialize` so snapshots can be handed directly to
//! the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pavilion_shared::constants::{ATTACHMENT_PREVIEW_PREFIX, EMPTY_CONVERSATION_PREVIEW};
use pavilion_shared::events::{ChatPushPayload, NotificationPayload};
use pavilion_shared::types::{ConversationId, MessageId, UserId};

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A single entry of the notification feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Unique notification identifier (synthesized if the push omitted it).
    pub id: String,
    pub title: String,
    pub content: String,
    /// Server-side notification category, kept as an opaque string.
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    /// Id of the related entity (event, post, ...), if any.
    pub related_id: Option<String>,
    /// Id of the user this notification concerns, if any.
    pub user_id: Option<String>,
}

impl From<NotificationPayload> for NotificationRecord {
    /// Fold a sparse pushed payload into a complete record.  A missing id
    /// is synthesized, a missing timestamp defaults to the arrival time and
    /// a missing read flag defaults to unread.
    fn from(p: NotificationPayload) -> Self {
        Self {
            id: p.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: p.title.unwrap_or_default(),
            content: p.content.unwrap_or_default(),
            kind: p.kind.unwrap_or_default(),
            read: p.read.unwrap_or(false),
            created_at: p.created_at.unwrap_or_else(Utc::now),
            related_id: p.related_id,
            user_id: p.user_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation summary
// ---------------------------------------------------------------------------

/// One row of the conversation list, carrying a denormalized "last message"
/// summary so the list renders without loading any timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub display_name: String,
    pub is_group: bool,
    pub avatar_ref: Option<String>,
    pub last_message_preview: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_sender_id: Option<UserId>,
    pub last_message_sender_display_name: Option<String>,
    pub participants: Vec<UserId>,
}

impl ConversationSummary {
    /// Reset the denormalized last-message fields to the empty state.
    pub fn clear_last_message(&mut self) {
        self.last_message_preview = EMPTY_CONVERSATION_PREVIEW.to_string();
        self.last_message_at = None;
        self.last_message_sender_id = None;
        self.last_message_sender_display_name = None;
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message inside an open conversation's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_display_name: String,
    /// Text content; `None` for pure attachment messages.
    pub content: Option<String>,
    /// Original file name of the attachment, if any.
    pub attachment_name: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Build a timeline record from a pushed foreign message.
    pub fn from_push(p: &ChatPushPayload, sender_display_name: String) -> Self {
        Self {
            id: p.message_id.clone(),
            conversation_id: p.group_id.clone(),
            sender_id: p.sender_id.clone(),
            sender_display_name,
            content: p.actual_message_content.clone(),
            attachment_name: p.file_name.clone(),
            sent_at: p.sent_at.unwrap_or_else(Utc::now),
        }
    }

    pub fn preview(&self) -> String {
        message_preview(self.content.as_deref(), self.attachment_name.as_deref())
    }
}

/// Derive the list preview for a message: text content wins, then the
/// attachment name, then the empty-conversation placeholder.
pub fn message_preview(content: Option<&str>, attachment_name: Option<&str>) -> String {
    if let Some(text) = content {
        if !text.is_empty() {
            return text.to_string();
        }
    }
    if let Some(name) = attachment_name {
        return format!("{ATTACHMENT_PREVIEW_PREFIX}{name}");
    }
    EMPTY_CONVERSATION_PREVIEW.to_string()
}
