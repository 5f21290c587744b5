//! Tunables and user-visible placeholder strings shared across crates.

/// Maximum number of notification records retained in the feed.
/// Older entries are silently dropped once the cap is exceeded.
pub const FEED_CAP: usize = 15;

/// Maximum consecutive reconnect attempts before the push connection
/// gives up and reports a terminal close.
pub const PUSH_MAX_RETRIES: u32 = 5;

/// Fixed delay between push reconnect attempts, in seconds.
pub const PUSH_RETRY_DELAY_SECS: u64 = 3;

/// Preview text shown for a conversation with no messages.
pub const EMPTY_CONVERSATION_PREVIEW: &str = "No messages yet";

/// Prefix used when a message carries an attachment but no text.
pub const ATTACHMENT_PREVIEW_PREFIX: &str = "Sent: ";
