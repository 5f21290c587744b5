//! Push-event bridge.
//!
//! A dedicated task drains the push connection's broadcast stream and
//! folds each event into the session state, independent of whatever view
//! is open.  The UI only learns about the result through [`ClientEvent`]s.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pavilion_api::PushEvent;
use pavilion_shared::events::ChatPushPayload;
use pavilion_shared::profile::provisional_name;
use pavilion_shared::types::UserId;
use pavilion_sync::models::{MessageRecord, NotificationRecord};
use pavilion_sync::ForeignPushOutcome;

use crate::events::{emit_event, ClientEvent};
use crate::identity::IdentityCache;
use crate::state::SessionState;

/// Spawn the bridge loop.  Exits when the push connection closes
/// terminally or the broadcast channel is dropped.
pub(crate) fn spawn_bridge(
    state: Arc<Mutex<SessionState>>,
    identity: Arc<IdentityCache>,
    mut push_rx: broadcast::Receiver<PushEvent>,
    events_tx: mpsc::Sender<ClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Push bridge started");

        loop {
            match push_rx.recv().await {
                Ok(PushEvent::Open) => {
                    emit_event(&events_tx, ClientEvent::PushStateChanged { connected: true });
                }
                Ok(PushEvent::Closed { reason }) => {
                    info!(reason = %reason, "Push connection closed, stopping bridge");
                    emit_event(&events_tx, ClientEvent::PushStateChanged { connected: false });
                    break;
                }
                Ok(PushEvent::Error(e)) => {
                    // Reconnection is the push manager's job; nothing to
                    // apply here.
                    debug!(error = %e, "Push transport error");
                }
                Ok(PushEvent::Notification(payload)) => {
                    let record = NotificationRecord::from(payload);
                    let (id, title, unread) = {
                        let mut st = state.lock().await;
                        st.feed.ingest_push(record.clone());
                        (record.id, record.title, st.feed.unread_count())
                    };
                    emit_event(&events_tx, ClientEvent::NotificationReceived { id, title });
                    emit_event(&events_tx, ClientEvent::UnreadCountChanged { unread });
                }
                Ok(PushEvent::ChatMessage(payload)) => {
                    handle_chat_push(&state, &identity, &events_tx, payload).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Gaps are tolerated; the next full refresh catches up.
                    warn!(skipped = n, "Push bridge lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("Push bridge stopped");
    })
}

/// Fold one pushed foreign message into the registry (and the open
/// timeline, when it matches), resolving the sender name through the
/// identity cache.
async fn handle_chat_push(
    state: &Arc<Mutex<SessionState>>,
    identity: &Arc<IdentityCache>,
    events_tx: &mpsc::Sender<ClientEvent>,
    payload: ChatPushPayload,
) {
    let sender_id = payload.sender_id.clone();
    let conversation_id = payload.group_id.clone();

    // A synchronous cache hit gives the final name immediately; otherwise
    // the registry shows a provisional placeholder until resolution below.
    let resolved = identity
        .peek(&sender_id)
        .map(|p| p.display_name(&provisional_name(&sender_id)));

    let outcome = {
        let mut st = state.lock().await;

        // Own messages were already applied on send.
        if sender_id == st.user_id {
            return;
        }

        let outcome = st.registry.apply_foreign_push(&payload, resolved.as_deref());
        if matches!(outcome, ForeignPushOutcome::Applied { .. }) {
            if let Some(timeline) = st.timeline.as_mut() {
                if timeline.conversation_id() == &conversation_id {
                    let name = resolved
                        .clone()
                        .or_else(|| payload.sender_name.clone())
                        .unwrap_or_else(|| provisional_name(&sender_id));
                    timeline.append(MessageRecord::from_push(&payload, name));
                }
            }
        }
        outcome
    };

    match outcome {
        ForeignPushOutcome::Applied { provisional } => {
            emit_event(
                events_tx,
                ClientEvent::ConversationUpdated {
                    conversation_id: conversation_id.clone(),
                },
            );
            emit_event(
                events_tx,
                ClientEvent::MessageReceived {
                    conversation_id: conversation_id.clone(),
                    message_id: payload.message_id.clone(),
                },
            );

            if provisional {
                resolve_sender_name(
                    state.clone(),
                    identity.clone(),
                    events_tx.clone(),
                    conversation_id,
                    sender_id,
                );
            }
        }
        ForeignPushOutcome::UnknownConversation => {
            // Deliberately dropped; the conversation appears on the next
            // full refresh.
            debug!(conversation = %conversation_id, "Push for unfetched conversation ignored");
        }
    }
}

/// Resolve a provisional sender name in the background and patch it into
/// the registry and any open timeline.
fn resolve_sender_name(
    state: Arc<Mutex<SessionState>>,
    identity: Arc<IdentityCache>,
    events_tx: mpsc::Sender<ClientEvent>,
    conversation_id: pavilion_shared::types::ConversationId,
    sender_id: UserId,
) {
    tokio::spawn(async move {
        let Some(profile) = identity.resolve(&sender_id).await else {
            return;
        };
        let name = profile.display_name(&provisional_name(&sender_id));

        let patched = {
            let mut st = state.lock().await;
            let in_registry =
                st.registry
                    .update_sender_display_name(&conversation_id, &sender_id, &name);
            if let Some(timeline) = st.timeline.as_mut() {
                if timeline.conversation_id() == &conversation_id {
                    timeline.update_sender_display_name(&sender_id, &name);
                }
            }
            in_registry
        };

        if patched {
            emit_event(&events_tx, ClientEvent::ConversationUpdated { conversation_id });
        }
    });
}
