use serde::{Deserialize, Serialize};

// Backend identifiers are opaque strings (the identity service mints them).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix of the id used for provisional display names.  Ids are
    /// opaque and may be non-ASCII, so the cut lands on a char boundary.
    pub fn short(&self) -> &str {
        let mut end = self.0.len().min(8);
        while !self.0.is_char_boundary(end) {
            end -= 1;
        }
        &self.0[..end]
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content category of a chat message, as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Text,
    File,
    Image,
    Video,
    Audio,
}

impl MessageKind {
    /// Whether the message body is an attachment rather than text.
    pub fn is_attachment(self) -> bool {
        !matches!(self, Self::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_short() {
        let id = UserId::new("a1b2c3d4e5f6");
        assert_eq!(id.short(), "a1b2c3d4");

        let tiny = UserId::new("ab");
        assert_eq!(tiny.short(), "ab");
    }

    #[test]
    fn test_user_id_short_cuts_on_char_boundary() {
        // Byte 8 falls inside the fourth "é"; back up to byte 7.
        let id = UserId::new("aééééé");
        assert_eq!(id.short(), "aééé");

        // Exactly 8 bytes of two-byte chars: kept whole.
        let id = UserId::new("đđđđ");
        assert_eq!(id.short(), "đđđđ");
    }

    #[test]
    fn test_message_kind_wire_names() {
        let kind: MessageKind = serde_json::from_str("\"IMAGE\"").unwrap();
        assert_eq!(kind, MessageKind::Image);
        assert!(kind.is_attachment());
        assert!(!MessageKind::Text.is_attachment());
    }
}
