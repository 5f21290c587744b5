// Outbound transport layer: REST client with bearer auth and the
// WebSocket push connection manager.

pub mod attachments;
pub mod client;
pub mod conversations;
pub mod notifications;
pub mod push;
pub mod users;

mod error;

pub use attachments::AttachmentDownload;
pub use client::{ApiClient, RefreshFn};
pub use error::{ApiError, Result};
pub use push::{PushConfig, PushEvent, PushHandle, PushManager};
