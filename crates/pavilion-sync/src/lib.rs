//! # pavilion-sync
//!
//! In-memory reconciliation state for the Pavilion client: the notification
//! feed, the conversation registry and the per-conversation message
//! timeline.  These structures merge three independently-arriving sources —
//! REST snapshots, local mutations and pushed events — into one consistent
//! view.  They are owned by the session layer and handed to the UI only as
//! read snapshots.

pub mod feed;
pub mod models;
pub mod registry;
pub mod timeline;

pub use feed::NotificationFeed;
pub use models::{message_preview, ConversationSummary, MessageRecord, NotificationRecord};
pub use registry::{ConversationRegistry, ForeignPushOutcome};
pub use timeline::MessageTimeline;
