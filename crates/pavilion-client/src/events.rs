//! Events emitted to the UI layer.
//!
//! The UI holds the receiving half of an mpsc channel and re-reads session
//! snapshots whenever an event arrives; payloads carry just enough to know
//! what changed.

use serde::Serialize;
use tokio::sync::mpsc;

use pavilion_shared::types::{ConversationId, MessageId};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// A notification arrived on the push channel.
    NotificationReceived { id: String, title: String },
    /// The derived unread count changed.
    UnreadCountChanged { unread: usize },
    /// A conversation summary changed (send, delete, foreign push, name
    /// resolution).
    ConversationUpdated { conversation_id: ConversationId },
    /// A foreign message was folded into an open conversation.
    MessageReceived {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    /// The push transport connected or terminally closed.
    PushStateChanged { connected: bool },
    /// The bearer token was rejected and could not be refreshed; the UI
    /// must redirect to login.
    SessionExpired,
}

/// Best-effort emit; a full or closed channel only loses UI refresh hints,
/// never state.
pub fn emit_event(tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    if let Err(e) = tx.try_send(event) {
        tracing::debug!(error = %e, "Dropped client event");
    }
}
