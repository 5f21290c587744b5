//! Session facade: the operations the UI layer calls.
//!
//! One `Session` binds the REST client, the identity cache and the push
//! bridge to a single authenticated user.  Signing in as a different user
//! replaces the push connection (the manager tears the old one down) and
//! starts from a fresh identity cache, so nothing leaks across accounts.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use pavilion_api::{ApiClient, ApiError, PushManager, RefreshFn, Result};
use pavilion_shared::profile::provisional_name;
use pavilion_shared::types::{ConversationId, MessageId, UserId};
use pavilion_sync::models::{ConversationSummary, MessageRecord, NotificationRecord};
use pavilion_sync::MessageTimeline;

use crate::bridge;
use crate::events::{emit_event, ClientEvent};
use crate::identity::IdentityCache;
use crate::state::SessionState;

/// Everything needed to start a session for one authenticated user.
pub struct SessionConfig {
    /// REST base URL, e.g. `https://portal.example.org`.
    pub base_url: String,
    pub user_id: UserId,
    /// Current bearer token.
    pub token: String,
    /// Opaque token-refresh hook, called at most once per rejected request.
    pub refresh: RefreshFn,
}

pub struct Session {
    user_id: UserId,
    api: Arc<ApiClient>,
    identity: Arc<IdentityCache>,
    push: Arc<PushManager>,
    state: Arc<Mutex<SessionState>>,
    events_tx: mpsc::Sender<ClientEvent>,
}

impl Session {
    /// Wire up a session and connect the push channel.
    ///
    /// The push manager is shared process-wide and injected explicitly; a
    /// sign-in for a different user than the manager currently serves
    /// replaces the connection before any event can cross sessions.
    /// Returns the session plus the receiving half of the [`ClientEvent`]
    /// channel.
    pub async fn sign_in(
        config: SessionConfig,
        push: Arc<PushManager>,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let api = Arc::new(ApiClient::new(
            config.base_url,
            config.token.clone(),
            config.refresh,
        ));
        let identity = Arc::new(IdentityCache::over_api(api.clone()));
        let state = Arc::new(Mutex::new(SessionState::new(config.user_id.clone())));
        let (events_tx, events_rx) = mpsc::channel(256);

        info!(user = %config.user_id, "Starting session");
        let handle = push.connect(config.user_id.clone(), config.token).await;
        bridge::spawn_bridge(
            state.clone(),
            identity.clone(),
            handle.subscribe(),
            events_tx.clone(),
        );

        (
            Self {
                user_id: config.user_id,
                api,
                identity,
                push,
                state,
                events_tx,
            },
            events_rx,
        )
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Tear the session down: close the push connection and clear the
    /// identity cache so no display name survives an account switch.
    pub async fn sign_out(&self) {
        info!(user = %self.user_id, "Signing out");
        self.push.disconnect().await;
        self.identity.clear();
    }

    // -----------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------

    /// Re-fetch the notification feed.  On failure the in-memory feed is
    /// left exactly as it was.
    pub async fn refresh_notifications(&self, limit: usize) -> Result<Vec<NotificationRecord>> {
        let records = self
            .observe(self.api.fetch_notifications(&self.user_id, limit).await)?;
        let unread = {
            let mut st = self.state.lock().await;
            st.feed.seed(records.clone());
            st.feed.unread_count()
        };
        emit_event(&self.events_tx, ClientEvent::UnreadCountChanged { unread });
        Ok(records)
    }

    /// Mark one notification read, backend first.  The local flip only
    /// happens after the backend confirmed, so a failed call leaves the
    /// feed untouched.
    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.observe(self.api.mark_notification_read(notification_id).await)?;
        let unread = {
            let mut st = self.state.lock().await;
            st.feed.mark_read(notification_id);
            st.feed.unread_count()
        };
        emit_event(&self.events_tx, ClientEvent::UnreadCountChanged { unread });
        Ok(())
    }

    pub async fn notifications(&self) -> Vec<NotificationRecord> {
        self.state.lock().await.feed.records().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.state.lock().await.feed.unread_count()
    }

    // -----------------------------------------------------------------
    // Conversations
    // -----------------------------------------------------------------

    /// Re-fetch the conversation list.  Also how conversations that were
    /// invisible to push reconciliation (created after the last fetch)
    /// become known.
    pub async fn refresh_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let summaries = self
            .observe(self.api.fetch_conversations(&self.user_id).await)?;
        let mut st = self.state.lock().await;
        st.registry.replace_all(summaries);
        Ok(st.registry.entries().to_vec())
    }

    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        self.state.lock().await.registry.entries().to_vec()
    }

    /// Load a conversation's timeline and make it the open one.
    ///
    /// Opening bumps the timeline generation; if the user navigated away
    /// (or opened another conversation) while the fetch was in flight, the
    /// stale response is discarded instead of clobbering newer state.
    pub async fn open_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        let generation = {
            let mut st = self.state.lock().await;
            st.timeline = None;
            st.timeline_generation += 1;
            st.timeline_generation
        };

        let mut messages = self
            .observe(self.api.fetch_messages(conversation_id).await)?;
        self.resolve_sender_names(&mut messages).await;

        let mut st = self.state.lock().await;
        if st.timeline_generation != generation {
            debug!(conversation = %conversation_id, "Discarding stale timeline fetch");
            return Ok(());
        }
        st.timeline = Some(MessageTimeline::new(conversation_id.clone(), messages));
        Ok(())
    }

    /// Discard the open timeline (navigate-away).
    pub async fn close_conversation(&self) {
        let mut st = self.state.lock().await;
        st.timeline = None;
        st.timeline_generation += 1;
    }

    /// Snapshot of the open timeline, if one is loaded.
    pub async fn timeline(&self) -> Option<Vec<MessageRecord>> {
        self.state
            .lock()
            .await
            .timeline
            .as_ref()
            .map(|t| t.messages().to_vec())
    }

    /// Send a text message into a conversation.
    ///
    /// The message is applied optimistically — appended to the open
    /// timeline and the conversation moved to the front — before the
    /// backend confirms.  On confirmation the optimistic record is
    /// replaced by the server's.  On failure the optimistic entry is
    /// deliberately kept (matching the portal's long-standing behavior;
    /// the next refresh reconciles) and the error is surfaced.
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> Result<MessageRecord> {
        let display_name = match self.identity.resolve(&self.user_id).await {
            Some(profile) => profile.display_name(&provisional_name(&self.user_id)),
            None => provisional_name(&self.user_id),
        };
        let optimistic = MessageRecord {
            id: MessageId::new(format!("local-{}", Uuid::new_v4())),
            conversation_id: conversation_id.clone(),
            sender_id: self.user_id.clone(),
            sender_display_name: display_name,
            content: Some(content.to_string()),
            attachment_name: None,
            sent_at: Utc::now(),
        };

        {
            let mut st = self.state.lock().await;
            if let Some(timeline) = st.timeline.as_mut() {
                if timeline.conversation_id() == conversation_id {
                    timeline.append(optimistic.clone());
                }
            }
            st.registry.apply_local_send(conversation_id, &optimistic);
        }
        emit_event(
            &self.events_tx,
            ClientEvent::ConversationUpdated {
                conversation_id: conversation_id.clone(),
            },
        );

        let confirmed = self
            .observe(self.api.post_message(conversation_id, content).await)?;

        {
            let mut st = self.state.lock().await;
            if let Some(timeline) = st.timeline.as_mut() {
                if timeline.conversation_id() == conversation_id {
                    timeline.remove(&optimistic.id);
                    timeline.append(confirmed.clone());
                }
            }
            st.registry.apply_local_send(conversation_id, &confirmed);
        }
        emit_event(
            &self.events_tx,
            ClientEvent::ConversationUpdated {
                conversation_id: conversation_id.clone(),
            },
        );
        Ok(confirmed)
    }

    /// Delete a message from the open timeline.
    ///
    /// The local removal happens first; if the backend rejects the delete
    /// the prior timeline is restored wholesale.  On success the
    /// conversation summary is recomputed from the newest survivor.
    pub async fn delete_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<()> {
        let (snapshot, generation) = {
            let mut st = self.state.lock().await;
            let generation = st.timeline_generation;
            let timeline = st
                .timeline
                .as_mut()
                .filter(|t| t.conversation_id() == conversation_id)
                .ok_or(ApiError::NotFound)?;
            let snapshot = timeline.clone();
            if timeline.remove(message_id).is_none() {
                return Err(ApiError::NotFound);
            }
            (snapshot, generation)
        };

        match self
            .observe(self.api.delete_message(conversation_id, message_id).await)
        {
            Ok(()) => {
                // Recompute the summary from the timeline as it stood when
                // the delete started; the user may have opened another
                // conversation while the request was in flight, and its
                // timeline must not bleed into this conversation's summary.
                let mut survivors = snapshot;
                survivors.remove(message_id);
                let mut st = self.state.lock().await;
                st.registry.apply_deletion(conversation_id, survivors.newest());
                drop(st);
                emit_event(
                    &self.events_tx,
                    ClientEvent::ConversationUpdated {
                        conversation_id: conversation_id.clone(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                // Roll back to the pre-delete timeline, unless the user
                // navigated away in the meantime; a stale restore would
                // clobber the newer view.
                let mut st = self.state.lock().await;
                if st.timeline_generation == generation {
                    st.timeline = Some(snapshot);
                }
                Err(e)
            }
        }
    }

    /// Leave a conversation (or acknowledge being removed from it).
    pub async fn leave_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        self.observe(
            self.api
                .leave_conversation(conversation_id, &self.user_id)
                .await,
        )?;
        {
            let mut st = self.state.lock().await;
            st.registry.remove_conversation(conversation_id);
            let open_here = st
                .timeline
                .as_ref()
                .is_some_and(|t| t.conversation_id() == conversation_id);
            if open_here {
                st.timeline = None;
                st.timeline_generation += 1;
            }
        }
        emit_event(
            &self.events_tx,
            ClientEvent::ConversationUpdated {
                conversation_id: conversation_id.clone(),
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    /// Resolve display names for every distinct sender in a fetched batch.
    async fn resolve_sender_names(&self, messages: &mut [MessageRecord]) {
        let senders: HashSet<UserId> =
            messages.iter().map(|m| m.sender_id.clone()).collect();
        for sender in senders {
            if let Some(profile) = self.identity.resolve(&sender).await {
                let name = profile.display_name(&provisional_name(&sender));
                for message in messages.iter_mut().filter(|m| m.sender_id == sender) {
                    message.sender_display_name = name.clone();
                }
            }
        }
    }

    /// Surface an auth-expired failure as a [`ClientEvent::SessionExpired`]
    /// in addition to the returned error.
    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ApiError::AuthExpired) = result {
            emit_event(&self.events_tx, ClientEvent::SessionExpired);
        }
        result
    }
}
