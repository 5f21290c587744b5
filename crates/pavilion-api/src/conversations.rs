//! Conversation and message endpoints.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;

use pavilion_shared::constants::EMPTY_CONVERSATION_PREVIEW;
use pavilion_shared::profile::provisional_name;
use pavilion_shared::types::{ConversationId, MessageId, UserId};
use pavilion_sync::models::{ConversationSummary, MessageRecord};

use crate::client::ApiClient;
use crate::error::Result;

/// Conversation row as the backend sends it; most summary fields are
/// optional on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationDto {
    id: ConversationId,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    is_group: bool,
    #[serde(default)]
    avatar_ref: Option<String>,
    #[serde(default)]
    last_message_preview: Option<String>,
    #[serde(default)]
    last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_message_sender_id: Option<UserId>,
    #[serde(default)]
    last_message_sender_display_name: Option<String>,
    #[serde(default)]
    participants: Vec<UserId>,
}

impl From<ConversationDto> for ConversationSummary {
    fn from(dto: ConversationDto) -> Self {
        Self {
            id: dto.id,
            display_name: dto.display_name.unwrap_or_default(),
            is_group: dto.is_group,
            avatar_ref: dto.avatar_ref,
            last_message_preview: dto
                .last_message_preview
                .unwrap_or_else(|| EMPTY_CONVERSATION_PREVIEW.to_string()),
            last_message_at: dto.last_message_at,
            last_message_sender_id: dto.last_message_sender_id,
            last_message_sender_display_name: dto.last_message_sender_display_name,
            participants: dto.participants,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDto {
    id: MessageId,
    #[serde(default)]
    conversation_id: Option<ConversationId>,
    sender_id: UserId,
    #[serde(default)]
    sender_display_name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    sent_at: Option<DateTime<Utc>>,
}

impl MessageDto {
    fn into_record(self, conversation_id: &ConversationId) -> MessageRecord {
        let sender_display_name = self
            .sender_display_name
            .unwrap_or_else(|| provisional_name(&self.sender_id));
        MessageRecord {
            id: self.id,
            conversation_id: self
                .conversation_id
                .unwrap_or_else(|| conversation_id.clone()),
            sender_id: self.sender_id,
            sender_display_name,
            content: self.content,
            attachment_name: self.file_name,
            sent_at: self.sent_at.unwrap_or_else(Utc::now),
        }
    }
}

impl ApiClient {
    /// Fetch the user's conversation list (order is re-derived locally).
    pub async fn fetch_conversations(&self, user_id: &UserId) -> Result<Vec<ConversationSummary>> {
        let dtos: Vec<ConversationDto> = self
            .request_json(
                Method::GET,
                "/api/conversations",
                &[("userId", user_id.to_string())],
                None,
            )
            .await?;
        Ok(dtos.into_iter().map(ConversationSummary::from).collect())
    }

    /// Fetch the messages of one conversation.
    pub async fn fetch_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<MessageRecord>> {
        let dtos: Vec<MessageDto> = self
            .request_json(
                Method::GET,
                &format!("/api/conversations/{conversation_id}/messages"),
                &[],
                None,
            )
            .await?;
        Ok(dtos
            .into_iter()
            .map(|dto| dto.into_record(conversation_id))
            .collect())
    }

    /// Post a new text message. Returns the server-confirmed record.
    pub async fn post_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> Result<MessageRecord> {
        let body = serde_json::json!({ "content": content });
        let dto: MessageDto = self
            .request_json(
                Method::POST,
                &format!("/api/conversations/{conversation_id}/messages"),
                &[],
                Some(&body),
            )
            .await?;
        Ok(dto.into_record(conversation_id))
    }

    /// Delete a message.
    pub async fn delete_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<()> {
        self.request(
            Method::DELETE,
            &format!("/api/conversations/{conversation_id}/messages/{message_id}"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }

    /// Leave (or delete membership in) a conversation.
    pub async fn leave_conversation(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<()> {
        self.request(
            Method::DELETE,
            &format!("/api/conversations/{conversation_id}/members/{user_id}"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }
}
