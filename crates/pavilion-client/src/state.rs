//! Reconciliation state for one authenticated session.
//!
//! The struct is wrapped in `Arc<tokio::sync::Mutex<>>` and shared between
//! the session operations and the push bridge task; every mutation is a
//! short critical section on the runtime.

use pavilion_shared::types::UserId;
use pavilion_sync::{ConversationRegistry, MessageTimeline, NotificationFeed};

/// Central session state.
pub struct SessionState {
    /// The authenticated user everything in this state belongs to.
    pub user_id: UserId,

    /// Bounded newest-first notification feed.
    pub feed: NotificationFeed,

    /// Ordered conversation list.
    pub registry: ConversationRegistry,

    /// Timeline of the currently-open conversation, if any.  Discarded on
    /// navigate-away; reopening reloads from the backend.
    pub timeline: Option<MessageTimeline>,

    /// Bumped every time a conversation is opened or closed; a fetch whose
    /// generation no longer matches on completion is stale and applies
    /// nothing.
    pub timeline_generation: u64,
}

impl SessionState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            feed: NotificationFeed::new(),
            registry: ConversationRegistry::new(),
            timeline: None,
            timeline_generation: 0,
        }
    }
}
