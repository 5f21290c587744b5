//! User profile data and the display-name derivation rule.
//!
//! The same rule is applied everywhere a profile is rendered so that a
//! user's name never differs between the feed, the conversation list and
//! an open timeline.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A foreign user's profile as returned by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    /// Reference to the avatar image, if the user has one.
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

impl UserProfile {
    /// Derive the display name: `trim(last_name + " " + first_name)`,
    /// falling back to the username, then to `fallback`.
    pub fn display_name(&self, fallback: &str) -> String {
        let full = format!("{} {}", self.last_name, self.first_name);
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        if !self.username.is_empty() {
            return self.username.clone();
        }
        fallback.to_string()
    }
}

/// Provisional display name shown while a profile lookup is in flight.
pub fn provisional_name(user_id: &UserId) -> String {
    format!("User({})", user_id.short())
}
