// Shared domain types for the Pavilion client sync core.

pub mod constants;
pub mod events;
pub mod profile;
pub mod types;

pub use events::{ChatPushPayload, NotificationPayload, PushFrame};
pub use profile::{provisional_name, UserProfile};
pub use types::{ConversationId, MessageId, MessageKind, UserId};
